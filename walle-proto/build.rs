fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_file = "../proto/walle/v1/walle.proto";
    let proto_dir = "../proto";

    // Tell cargo to invalidate the built crate whenever the proto file changes
    println!("cargo:rerun-if-changed={}", proto_file);

    // Fall back to the bundled protoc when none is configured
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", protoc);
        }
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&[proto_file], &[proto_dir])?;

    Ok(())
}
