pub mod error;
pub mod network;
pub mod unet;

pub use error::{ModelError, Result};
pub use network::{PersistableParameters, Trainable};
pub use unet::geometry::PaddingPlan;
pub use unet::{BorderMode, UNet, UNetTopology, UNetTransform};
