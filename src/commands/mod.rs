// Single module run
pub mod run;

// Plan files
pub mod apply;

// Module listing
pub mod catalog;
