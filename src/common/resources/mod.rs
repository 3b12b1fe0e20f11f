//! # Resource definitions for model weights, vocabularies and configuration files
//!
//! Pretrained checkpoints are referenced through resources. A checkpoint directory is expected to
//! hold:
//! - model weights (`rust_model.ot`)
//! - the model configuration (`config.json`)
//! - vocabularies (`vocab.txt`, `vocab.json` or `spiece.model` depending on the tokenizer)
//! - (optional) merges files for BPE-based tokenizers (`merges.txt`)
//! - (optional) a tokenizer configuration (`tokenizer_config.json`)
//!
//! Two types of resources are pre-defined:
//! - LocalResource: points to a local file
//! - RemoteResource: points to a remote file via a URL, downloaded and cached on first access
//!
//! For both types of resources, the local location of the file can be retrieved using
//! `get_local_path`, allowing to reference the resource file location regardless if it is a remote
//! or local resource. `resource_for_file` picks the right kind of resource from the
//! `pretrained_model_path` setting.

mod local;
mod remote;

use crate::common::error::Seq2SeqError;
pub use local::LocalResource;
pub use remote::{RemoteResource, CACHE};
use std::path::PathBuf;

/// # Resource Trait that can provide the location of the model, configuration or vocabulary resources
pub trait ResourceProvider {
    /// Provides the local path for a resource.
    ///
    /// # Returns
    ///
    /// * `PathBuf` pointing to the resource file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_seq2seq::resources::{LocalResource, ResourceProvider};
    /// use std::path::PathBuf;
    /// let config_resource = LocalResource {
    ///     local_path: PathBuf::from("path/to/config.json"),
    /// };
    /// let config_path = config_resource.get_local_path();
    /// ```
    fn get_local_path(&self) -> Result<PathBuf, Seq2SeqError>;
}

/// Builds the resource pointing to `file_name` inside a pretrained checkpoint location.
///
/// Locations starting with `http://` or `https://` are treated as remote base URLs and the
/// resulting resource is cached in a sub-directory named after the last path segment of the
/// location. Any other location is read as a local directory.
///
/// # Example
///
/// ```no_run
/// use rust_seq2seq::resources::{resource_for_file, ResourceProvider};
/// let vocab_resource = resource_for_file("https://huggingface.co/gpt2/resolve/main", "vocab.json");
/// let vocab_path = vocab_resource.get_local_path()?;
/// # Ok::<(), rust_seq2seq::Seq2SeqError>(())
/// ```
pub fn resource_for_file(location: &str, file_name: &str) -> Box<dyn ResourceProvider> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let base = location.trim_end_matches('/');
        let cache_subdir = base
            .trim_end_matches("/resolve/main")
            .rsplit('/')
            .next()
            .unwrap_or("pretrained");
        Box::new(RemoteResource::new(
            &format!("{}/{}", base, file_name),
            cache_subdir,
        ))
    } else {
        Box::new(LocalResource {
            local_path: PathBuf::from(location).join(file_name),
        })
    }
}
