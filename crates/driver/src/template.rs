// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{PLACEHOLDER}}` substitution for the compose template. Deliberately
//! not a templating engine: the template has a fixed, known placeholder
//! set, so plain string replacement is the idiomatic amount of machinery.

/// Replace every `{{key}}` in `template` with its value from `vars`.
///
/// `vars` entries are `(placeholder_name, value)`, e.g. `("TENANT_ID", "t_1")`
/// matches `{{TENANT_ID}}` in the template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_owned();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }
    rendered
}
