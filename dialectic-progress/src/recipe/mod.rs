//! Recipe registry.
//!
//! A recipe is the ordered list of steps a stage runs. Each step declares
//! its job kind, the inputs it needs, and the outputs it produces. Recipes
//! are validated on load and replaced wholesale when a new template version
//! arrives.

mod registry;
mod step;

pub use registry::{RecipeRegistry, StageRecipe};
pub use step::{
    ArtifactClass, FileType, InputKind, InputRequirement, OutputRequirement, RecipeStep,
};
