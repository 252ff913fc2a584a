pub mod docx;
pub mod element;
mod error;
pub mod model;
pub mod package;

pub use docx::{ImportOptions, create_document_json, create_document_json_with};
pub use element::Element;
pub use error::Error;
pub use model::{Comment, Footnote, HeaderFooter, ImportResult, Mark, MarkType, Node, NodeType};
pub use package::Package;

use std::path::Path;
use std::time::Instant;

pub fn convert_docx_to_json(
    input: &Path,
    output: &Path,
    options: ImportOptions,
    pretty: bool,
) -> Result<(), Error> {
    let t0 = Instant::now();

    let package = Package::open(input)?;
    let t_load = t0.elapsed();

    let result = create_document_json_with(&package, options)?;
    let t_convert = t0.elapsed();

    let bytes = to_json(&result, pretty)?;
    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, convert={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_convert - t_load).as_secs_f64() * 1000.0,
        (t_total - t_convert).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}

pub fn convert_docx_bytes_to_json(input: &[u8], options: ImportOptions) -> Result<ImportResult, Error> {
    let t0 = Instant::now();

    let package = Package::from_bytes(input)?;
    let t_load = t0.elapsed();

    let result = create_document_json_with(&package, options)?;

    log::info!(
        "Timing: load={:.1}ms, convert={:.1}ms",
        t_load.as_secs_f64() * 1000.0,
        (t0.elapsed() - t_load).as_secs_f64() * 1000.0,
    );

    Ok(result)
}

pub fn to_json(result: &ImportResult, pretty: bool) -> Result<Vec<u8>, Error> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(result)?
    } else {
        serde_json::to_vec(result)?
    };
    Ok(bytes)
}
