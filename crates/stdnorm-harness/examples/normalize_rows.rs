use stdnorm_harness::scenarios::{batch_expectation, batch_tensor};
use stdnorm_harness::{check_pointwise_near, load_config, max_abs_diff};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let env = config.build_environment()?;
    let src = batch_tensor()?;

    println!("\n--- Nine-row batch ---");
    let mut failures = 0;
    for configuration in env.configurations() {
        let dst = env.run(&configuration, &src, src.shape())?;
        let (expected, tolerance) = batch_expectation(configuration.precision);
        let tolerance = env.tolerance(tolerance);
        let label = configuration.to_string();
        let max = max_abs_diff(dst.data(), &expected).map_or(0.0, |(_, d)| d);
        match check_pointwise_near(&label, dst.data(), &expected, tolerance) {
            Ok(()) => println!("{label:<40} ok    max |diff| {max:.3e}"),
            Err(e) => {
                failures += 1;
                println!("{label:<40} FAIL  {e}");
            }
        }
    }

    for (i, row) in src.rows().enumerate() {
        println!("row {i}: {row:?}");
    }
    anyhow::ensure!(failures == 0, "{failures} configurations out of tolerance");
    Ok(())
}
