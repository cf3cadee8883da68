use bfvm::Machine;

fn main() {
    // Classic "Hello World!" program
    let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

    let mut vm = match Machine::new(code) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("malformed program: {err}");
            std::process::exit(3);
        }
    };

    if let Err(err) = vm.run() {
        eprintln!("bfvm error: {err}");
        std::process::exit(4);
    }

    // Tip: to inspect program execution without performing I/O, you can use:
    // let mut vm = Machine::new(">+.<").unwrap();
    // let _ = vm.run_debug(); // prints a step-by-step table
}
