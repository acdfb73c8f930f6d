//! Control-plane layer.
//!
//! Owns the configuration model and turns configuration documents into running
//! subscriptions and publications through the plugin registry. Replacing or removing a
//! publication always stops the old delivery pipeline before it is dropped.
//!
//! ```
//! use radar_exchange::control_plane::config::ConfigDocument;
//! use radar_exchange::control_plane::plugin_registry::PluginRegistry;
//! use radar_exchange::storage::StorageRegistry;
//!
//! let document = ConfigDocument::from_json5(
//!     r#"{
//!         publication: {
//!             name: "local-copy",
//!             active: true,
//!             connection: {
//!                 class: "simple",
//!                 arguments: {sender: {class: "storage", arguments: {file_storage: ["archive"]}}},
//!             },
//!         },
//!     }"#,
//! )
//! .unwrap();
//!
//! let ConfigDocument::Publication(config) = document else {
//!     unreachable!()
//! };
//! let publication = PluginRegistry::with_defaults()
//!     .build_publication(&config, &StorageRegistry::new())
//!     .unwrap();
//! assert_eq!(publication.connection_kind(), "simple");
//! publication.stop();
//! ```

pub mod config;
pub mod plugin_registry;
pub mod publication_registry;
