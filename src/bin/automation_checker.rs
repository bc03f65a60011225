use std::io;

use hybrid_ops::{
    heuristics::BuiltinHeuristic,
    logging::init_stderr_tracing,
    tool::{ToolEnvironment, ToolSpec, run},
};

fn main() {
    if let Err(err) = init_stderr_tracing("warn") {
        eprintln!("logging disabled: {err:#}");
    }

    let spec = ToolSpec::for_heuristic(BuiltinHeuristic::AutomationCheck);
    let code = run(
        &spec,
        &ToolEnvironment::from_process(),
        std::env::args().skip(1),
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    std::process::exit(code);
}
