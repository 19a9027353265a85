//! The concrete install steps

mod container_toolkit;
mod cuda;
mod directories;
mod docker;
mod drivers;
mod images;
mod manifest;
mod scripts;
mod secrets;

pub use container_toolkit::ContainerToolkitStep;
pub use cuda::{CudaToolkitStep, PROFILE_MARKER};
pub use directories::SetupDirectoriesStep;
pub use docker::DockerStep;
pub use drivers::NvidiaDriversStep;
pub use images::PullImagesStep;
pub use manifest::ManifestStep;
pub use scripts::ManagementScriptsStep;
pub use secrets::SecretsStep;
