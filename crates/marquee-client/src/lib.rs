pub mod http;
pub mod pipeline;
pub mod vimeo;
pub mod youtube;

#[cfg(test)]
mod stub;

pub use pipeline::movie_pipeline;
pub use vimeo::{VimeoClient, VimeoConfig};
pub use youtube::{YoutubeClient, YoutubeConfig};
