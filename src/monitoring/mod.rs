pub mod training_monitor;
