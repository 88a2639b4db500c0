use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use enclaveml_backend_ort::verify_identity;
use enclaveml_core::{load_from_path, save_to_path, BuildConfig, Device, ModelArtifact};
use enclaveml_tokenize::{BatchTokenizer, ExportLayout};
use tracing::info;

pub fn create_model(config: &BuildConfig, path: &Path) -> Result<()> {
    let model = config.build().context("invalid model configuration")?;
    save_to_path(&model, path)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "ONNX model saved to: {}", path.display())?;
    writeln!(stdout, "{}", model.describe())?;
    Ok(())
}

pub fn tokenize(tokenizer_dir: &Path) -> Result<()> {
    let tokenizer = BatchTokenizer::from_dir(tokenizer_dir)?;
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    tokenizer.run(stdin, stdout)?;
    Ok(())
}

pub fn inspect(path: &Path) -> Result<()> {
    let model = load_from_path(path)?;
    println!("{}", model.describe());
    Ok(())
}

pub fn verify(path: &Path, device: Device, batch: usize) -> Result<()> {
    let artifact = if path.is_dir() {
        ModelArtifact::ExportDir(path.to_path_buf())
    } else {
        ModelArtifact::OnnxPath(path.to_path_buf())
    };

    let check = verify_identity(&artifact, device, batch)
        .with_context(|| format!("identity check failed for {}", path.display()))?;
    info!(shape = ?check.shape, bytes = check.bytes, "identity check passed");
    println!(
        "identity ok: '{}' -> '{}', shape {:?}, {} bytes",
        check.input_name, check.output_name, check.shape, check.bytes
    );
    Ok(())
}

pub fn check_export(dir: &Path) -> Result<()> {
    let layout = ExportLayout::open(dir)?;
    let model = layout.load_model()?;
    let tokenizer = layout.load_tokenizer()?;

    println!("Export directory: {}", layout.dir.display());
    println!("  Model: {}", layout.model.display());
    println!("  Tokenizer: {}", tokenizer.source().display());
    for extra in &layout.extras {
        println!("  Extra: {}", extra.display());
    }
    println!("{}", model.describe());
    Ok(())
}
