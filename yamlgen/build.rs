/*!

The `LoggingTrait` custom resource definition is modeled as a Rust struct in the model crate. Here
we generate the corresponding k8s yaml file, which is needed to install the controller in a
cluster. Crates that depend on this file can add yamlgen as a dependency to ensure the file is
current. Scripts can call `cargo build --package yamlgen`.

!*/

use kube::CustomResourceExt;
use logsidecar_model::LoggingTrait;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

const YAMLGEN_DIR: &str = env!("CARGO_MANIFEST_DIR");
const HEADER: &str = "# This file is generated. Do not edit.\n";

fn main() {
    // Re-run this build script if the model changes.
    println!("cargo:rerun-if-changed=../model/src");

    let deploy_dir = PathBuf::from(YAMLGEN_DIR).join("deploy");
    std::fs::create_dir_all(&deploy_dir).unwrap_or_else(|e| {
        panic!(
            "unable to create directory '{}': {}",
            deploy_dir.display(),
            e
        )
    });
    let path = deploy_dir.join("logging-trait.yaml");

    let mut f = File::create(&path)
        .unwrap_or_else(|e| panic!("unable to open file '{}' for writing: {}", path.display(), e));

    f.write_all(HEADER.as_bytes())
        .expect("unable to write file header");
    serde_yaml::to_writer(&f, &LoggingTrait::crd()).expect("unable to write LoggingTrait CRD");
}
