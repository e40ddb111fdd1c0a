use dashgrid::export::export_csv;
use dashgrid::{generate_sample, SampleConfig};

/// Write the demo dataset to `sample_data.csv` in the working directory.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = SampleConfig::default();
    let table = generate_sample(&cfg)?;
    let artifact = export_csv(&table)?;

    let output_path = "sample_data.csv";
    std::fs::write(output_path, &artifact.bytes)?;

    println!(
        "Wrote {} rows ({} columns) to {output_path}",
        table.len(),
        table.columns.len()
    );
    Ok(())
}
