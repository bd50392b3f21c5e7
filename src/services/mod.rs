pub mod notifier;
pub mod templates;

pub use notifier::{LogNotifier, Notifier};
pub use templates::{RenderError, SpaShellRenderer, TemplateRenderer};
