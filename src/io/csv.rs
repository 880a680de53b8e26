/*!
# Saving ABC chains to CSV

Enable via the `csv` feature.
*/

use ndarray::{ArrayView2, ArrayView3, Axis};
use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::error::{AbcError, Result};
use crate::parameters::ParameterNames;

/**
Saves multi-chain samples laid out **chain × sample × parameter**.

The file has a header row `chain,sample,<name_0>,<name_1>,...` taken from `names`, followed by
one row per sample of every chain.

# Examples

```rust
use abc_mcmc::io::csv::save_csv;
use abc_mcmc::parameters::ParameterNames;
use ndarray::arr3;

let names = ParameterNames::new(["mu", "sigma"]).unwrap();
let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]]]);
save_csv(data.view(), &names, "/tmp/abc_chain.csv").expect("Expecting saving data to succeed");
```
*/
pub fn save_csv(
    samples: ArrayView3<f64>,
    names: &ParameterNames,
    path: impl AsRef<Path>,
) -> Result<()> {
    let (_, _, dim) = samples.dim();
    if dim != names.len() {
        return Err(AbcError::DimensionMismatch {
            expected: names.len(),
            found: dim,
        });
    }

    let mut wtr = Writer::from_writer(File::create(path)?);
    let mut header: Vec<String> = vec!["chain".to_string(), "sample".to_string()];
    header.extend(names.iter().map(str::to_string));
    wtr.write_record(&header)?;

    for (chain_idx, chain) in samples.axis_iter(Axis(0)).enumerate() {
        for (sample_idx, sample) in chain.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(sample.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Saves a single chain (sample × parameter) as chain 0.
pub fn save_chain_csv(
    samples: ArrayView2<f64>,
    names: &ParameterNames,
    path: impl AsRef<Path>,
) -> Result<()> {
    save_csv(samples.insert_axis(Axis(0)), names, path)
}
