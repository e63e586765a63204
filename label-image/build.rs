use std::path::Path;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);

    let proto_dir = Path::new("proto");
    let proto_file = proto_dir.join("label.proto");
    println!("cargo:rerun-if-changed={}", proto_file.display());
    tonic_build::compile_protos(proto_file).map_err(|e| {
        eprintln!("Failed to compile protos: {}", e);
        e
    })?;
    Ok(())
}
