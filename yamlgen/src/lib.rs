/*!

This crate is used to write out the YAML representation of the `LoggingTrait` CRD. The controller
creates no CRDs itself, so the generated manifest is what gets applied to a cluster before the
controller is deployed.

This `lib.rs` file is intentionally empty as `yamlgen` provides a `build.rs` that is invoked during
builds of other crates that specify `yamlgen` as a dependency.

!*/
