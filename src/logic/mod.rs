//! Logic modules: the steps around each Terraform run.
//!
//! # Modules
//!
//! - `resolver`: Module variable resolution (overrides, upstream outputs, defaults)
//! - `predeploy`: Backend bootstrap, including adoption of a pre-existing CI backend
//! - `postdeploy`: Trailing actions: training job refresh, image builds, key sync, ADF run

pub mod postdeploy;
pub mod predeploy;
pub mod resolver;
