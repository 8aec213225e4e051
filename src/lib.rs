//! Web front-end for an external super-resolution tool.
//!
//! Users upload an image through a form, the server runs the configured
//! upscaler as a subprocess and renders a page comparing the original with the
//! result. Uploaded and generated files are short-lived and removed by
//! housekeeping.

pub mod web;
