use napi::Result as NapiResult;
use napi_derive::napi;
use serde::{de::DeserializeOwned, Serialize};

use scop_sim_core::cooperative::scenario::{self, SimulationInput};
use scop_sim_core::corporate_tax::progressive::{self, CorporateTaxInput};
use scop_sim_core::scenarios::sensitivity::{self, SweepInput};
use scop_sim_core::SimulatorResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Deserialise `input_json`, run `compute`, and serialise its envelope.
fn run_json<I, O>(input_json: &str, compute: fn(&I) -> SimulatorResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = compute(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Standard company vs SCOP comparison.
#[napi]
pub fn simulate_scop(input_json: String) -> NapiResult<String> {
    run_json::<SimulationInput, _>(&input_json, scenario::simulate)
}

/// Progressive IS breakdown for a single taxable result.
#[napi]
pub fn corporate_tax(input_json: String) -> NapiResult<String> {
    run_json::<CorporateTaxInput, _>(&input_json, progressive::calculate_corporate_tax)
}

/// One-way sensitivity sweep of the SCOP savings.
#[napi]
pub fn savings_sweep(input_json: String) -> NapiResult<String> {
    run_json::<SweepInput, _>(&input_json, sensitivity::savings_sweep)
}
