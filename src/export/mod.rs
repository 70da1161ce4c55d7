// SPDX-License-Identifier: Apache-2.0

pub mod xlsx;

pub use xlsx::{export_filename, header_labels, XlsxWriter};
