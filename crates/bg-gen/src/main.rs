use std::process::ExitCode;

use bg_gen::Variant;

fn main() -> ExitCode {
    bg_gen::launch(Variant::Textured)
}
