pub type CmdResult<T> = upgrader::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod rules;
pub mod upgrade;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        upgrader::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (upgrader::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Upgrade(args) => dispatch!(args, global, upgrade),
        crate::Commands::Rules(args) => dispatch!(args, global, rules),
    }
}
