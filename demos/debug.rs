use bfvm::{Machine, Tape};

fn main() {
    // Demonstrate debug mode (no real I/O; prints a step-by-step table).
    // Move left off the start of the tape, increment, come back, output.
    let code = "<+>.";

    let mut vm = Machine::new(code).expect("brackets balance");

    if let Err(err) = vm.run_debug() {
        eprintln!("bfvm error: {err}");
        std::process::exit(4);
    }

    println!();
    println!("tape after run: {:?} (pointer at {})", vm.tape().cells(), vm.tape().position());
}
