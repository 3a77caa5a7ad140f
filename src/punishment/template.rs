//! Message template rendering.
//!
//! Templates use `{name}` placeholders. Known placeholders are listed in
//! [`PLACEHOLDERS`]; anything else is left in the output verbatim.

/// Placeholders understood by [`render`].
pub const PLACEHOLDERS: [&str; 6] = ["subject", "detection", "percentage", "time", "channel", "report"];

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    /// Subject identifier
    pub subject: String,
    /// Detection display name
    pub detection: String,
    /// Severity as an integer percentage
    pub percentage: u32,
    /// Formatted issue time
    pub time: String,
    /// Staff channel
    pub channel: String,
    /// Formatted sequence report
    pub report: String,
}

impl TemplateVars {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "subject" => Some(self.subject.clone()),
            "detection" => Some(self.detection.clone()),
            "percentage" => Some(self.percentage.to_string()),
            "time" => Some(self.time.clone()),
            "channel" => Some(self.channel.clone()),
            "report" => Some(self.report.clone()),
            _ => None,
        }
    }
}

/// Renders `template`, replacing every known placeholder.
#[must_use]
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Placeholder names in `template` that [`render`] does not know.
#[must_use]
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        let name = &after[..close];
        if !PLACEHOLDERS.contains(&name) {
            unknown.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    unknown
}
