use branchwise::{cli, ui};

fn main() {
    if let Err(err) = cli::run() {
        ui::output::fatal(format!("{err:#}"));
        std::process::exit(1);
    }
}
