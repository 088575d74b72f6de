use clap::Args;
use serde_json::Value;

use wacc_core::instruments::{self, ThreeStepInput};

use crate::input;

/// Arguments for the three-step instrument model
#[derive(Args)]
pub struct StructureArgs {
    /// Path to JSON or YAML file describing market parameters and instruments
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_structure(args: StructureArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let structure_input: ThreeStepInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file> or JSON on stdin is required for the three-step model".into());
    };

    let result = instruments::three_step_wacc(&structure_input)?;
    Ok(serde_json::to_value(result)?)
}
