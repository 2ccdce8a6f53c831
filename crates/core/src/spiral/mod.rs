pub mod config;
pub mod error;
pub mod index;
pub mod node;
pub mod render;
pub mod view;

pub use config::SpiralConfig;
pub use error::SpiralError;
pub use index::{ParentKey, SpiralIndex};
pub use node::{Composer, NodeState, Viewer};
pub use render::{
    render, reaction_display, Affordance, ComposerView, ReactionChip, ReactionDisplay, RenderNode,
};
pub use view::{PostStatus, ReactionChange, SpiralView};
