mod diagnostics;
mod interval;
mod io_utils;
pub mod math;
mod readers;
mod util;

pub use diagnostics::{Diagnostics, LogDiagnostics, VecDiagnostics};
pub use interval::Interval;
pub use io_utils::{dump_gz_json, write_pretty_json};
pub use readers::{input_name, numbered_lines, open_bed_reader, open_input, NumberedLines};
pub use util::{handle_error_and_exit, Error, Result};
