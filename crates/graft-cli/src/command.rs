// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The command line recorded in generated file headers.

use std::path::Path;

/// Canonical invocation, independent of how the flags were spelled:
/// `graftgen -interface=A,B -output=F [-dir=D] [-debug] [-custom_funcs=X,Y]`.
pub fn canonical(interfaces: &[String], output: &Path, dir: &Path, debug: bool, custom_funcs: &[String]) -> String {
    let mut parts = vec![
        "graftgen".to_string(),
        format!("-interface={}", interfaces.join(",")),
        format!("-output={}", output.display()),
    ];
    if dir != Path::new(".") {
        parts.push(format!("-dir={}", dir.display()));
    }
    if debug {
        parts.push("-debug".to_string());
    }
    if !custom_funcs.is_empty() {
        parts.push(format!("-custom_funcs={}", custom_funcs.join(",")));
    }
    parts.join(" ")
}
