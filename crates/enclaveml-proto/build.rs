fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    println!("cargo:rerun-if-changed=src/onnx.proto");

    tonic_prost_build::configure()
        .build_client(false)
        .build_server(false)
        .compile_protos(&["src/onnx.proto"], &["src"])?;
    Ok(())
}
