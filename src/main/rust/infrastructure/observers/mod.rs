mod logging_observer;

pub use logging_observer::LoggingObserver;
