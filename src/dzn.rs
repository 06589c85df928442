//! Renders an instance as a declarative data listing: one `name = value;`
//! statement per parameter, vectors as `[a, b]`, matrices as `[| row | row |]`.

use std::fmt::{self, Write};

use crate::params::ModelParameters;

pub fn write(params: &ModelParameters) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_to(&mut out, params);
    out
}

pub fn write_to(out: &mut impl Write, params: &ModelParameters) -> fmt::Result {
    scalar(out, "day_count", params.day_count())?;
    scalar(out, "client_count", params.client_count())?;
    scalar(out, "high_regime_days_allowed", params.high_regime_days_allowed())?;
    scalar(out, "high_regime_percent", params.high_regime_percent())?;
    if let Some(hydro) = params.hydro_plant() {
        // Data files index from one
        scalar(out, "hydro_plant", hydro + 1)?;
    }
    list(out, "plant_capacity", params.plant_capacity())?;
    list(out, "production_cost", params.production_cost())?;
    matrix(out, "demand", params.demand())?;
    list(out, "payment_rate", params.payment_rate())?;
    scalar(out, "min_service_percent", params.min_service_percent())
}

fn scalar(out: &mut impl Write, name: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(out, "{name} = {value};")
}

fn list(out: &mut impl Write, name: &str, values: &[u64]) -> fmt::Result {
    writeln!(out, "{name} = [{}];", join(values))
}

fn matrix(out: &mut impl Write, name: &str, rows: &[Vec<u64>]) -> fmt::Result {
    writeln!(out, "{name} = [|")?;
    for row in rows {
        writeln!(out, "{} |", join(row))?;
    }
    writeln!(out, "|];")
}

fn join(values: &[u64]) -> String {
    values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
