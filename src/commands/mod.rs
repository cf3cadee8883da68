pub mod repl;
pub mod run;

pub const EXIT_OK: i32 = 0;
pub const EXIT_NO_PROGRAM: i32 = 1;
pub const EXIT_UNREADABLE: i32 = 2;
pub const EXIT_INVALID_PROGRAM: i32 = 3;
pub const EXIT_ABORTED: i32 = 4;
