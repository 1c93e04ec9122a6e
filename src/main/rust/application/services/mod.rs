mod output_registry;
mod registry_message;
mod stream_output;

pub use output_registry::OutputRegistry;
pub use registry_message::{ChannelSignalSink, Command, CommandSender, RegistryMessage, SignalEnvelope};
pub use stream_output::StreamOutput;
