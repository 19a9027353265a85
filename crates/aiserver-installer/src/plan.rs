//! The fixed installation order

use crate::step::InstallStep;
use crate::steps::{
    ContainerToolkitStep, CudaToolkitStep, DockerStep, ManagementScriptsStep, ManifestStep,
    NvidiaDriversStep, PullImagesStep, SecretsStep, SetupDirectoriesStep,
};

/// Every install step, in execution order.
///
/// Later steps re-verify earlier artifacts through their own prechecks, so
/// the plan can be re-run after a partial failure.
pub fn install_plan() -> Vec<Box<dyn InstallStep>> {
    vec![
        Box::new(SetupDirectoriesStep),
        Box::new(NvidiaDriversStep),
        Box::new(CudaToolkitStep),
        Box::new(DockerStep),
        Box::new(ContainerToolkitStep),
        Box::new(ManifestStep),
        Box::new(SecretsStep),
        Box::new(ManagementScriptsStep),
        Box::new(PullImagesStep),
    ]
}
