#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub file_path: String,
    pub file_name: String,
    pub action: String,
    pub rule_name: Option<String>,
    pub destination: Option<String>,
    pub timestamp: String,
    pub result: String,
    pub details: Option<String>,
}

/// Row to insert into `activity_log`; id is generated on insert.
#[derive(Debug, Clone, Copy)]
pub struct NewActivity<'a> {
    pub file_path: &'a str,
    pub file_name: &'a str,
    pub action: &'a str,
    pub rule_name: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub timestamp: &'a str,
    pub result: &'a str,
    pub details: Option<&'a str>,
}
