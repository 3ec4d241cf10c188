use std::fmt::{self, Write};

use crate::dispatcher::ServerConfig;
use crate::status::{PinMode, StatusSource};

const STORAGE_COLUMNS: usize = 16;

/// Pages the web interface serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Status,
    Log,
    Config,
    Storage,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Status,
        Resource::Log,
        Resource::Config,
        Resource::Storage,
    ];

    /// Exact-match lookup; query strings and trailing slashes are not stripped.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource| resource.path() == path)
    }

    pub fn path(&self) -> &'static str {
        match self {
            Resource::Status => "/",
            Resource::Log => "/log",
            Resource::Config => "/conf",
            Resource::Storage => "/storage",
        }
    }

    /// Navigation button caption.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Status => "Status",
            Resource::Log => "Daily log",
            Resource::Config => "Configuration",
            Resource::Storage => "Storage dump",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Stream the page for `resource` into `out`.
///
/// Rendering stops at the first write error; [`growlink_frame::Response`]
/// reports one once a send failed.
pub fn render_page<W, S>(
    out: &mut W,
    resource: Resource,
    source: &S,
    config: &ServerConfig,
) -> fmt::Result
where
    W: Write + ?Sized,
    S: StatusSource + ?Sized,
{
    write!(out, "<html><h1>{}</h1>", config.page_title)?;
    for button in Resource::ALL {
        write!(
            out,
            "<input type=\"button\" onclick=\"document.location='{}'\" value=\"{}\"/>",
            button.path(),
            button.label()
        )?;
    }
    out.write_str("<hr/><pre>")?;
    brief_status(out, source)?;
    out.write_str("<hr/></pre><pre>")?;

    match resource {
        Resource::Status => pin_table(out, source)?,
        Resource::Config => config_form(out, config)?,
        Resource::Log => log_table(out, source)?,
        Resource::Storage => storage_dump(out, source)?,
    }

    out.write_str("</pre></html>")
}

fn brief_status<W, S>(out: &mut W, source: &S) -> fmt::Result
where
    W: Write + ?Sized,
    S: StatusSource + ?Sized,
{
    write!(out, "Free memory: {} bytes\r\n", source.free_memory())?;

    let boot = source.boot_record();
    write!(
        out,
        "Controller: startup: {}, first startup: {}\r\nLogger: {}, records {}/{}",
        boot.last_startup,
        boot.first_startup,
        if boot.logger_enabled { "enabled" } else { "disabled" },
        boot.log_records,
        boot.log_capacity
    )?;
    if boot.log_overflow {
        out.write_str(", overflow")?;
    }
    out.write_str("\r\n")?;

    let clock = source.clock();
    write!(
        out,
        "Clock: <b>{}</b> mode, time {}, up time [{}:00], down time [{}:00]\r\n",
        if clock.is_day { "DAY" } else { "NIGHT" },
        clock.time,
        clock.up_hour,
        clock.down_hour
    )?;

    let t = source.temperature();
    write!(
        out,
        "Temperature: current {:.2}, next {:.2} (count {}), day {:.2}+/-{:.2}, \
         night {:.2}+/-{:.2}, critical {:.2}\r\n",
        t.current,
        t.next,
        t.count,
        t.day,
        t.delta,
        t.night,
        2.0 * t.delta,
        t.critical
    )
}

fn pin_table<W, S>(out: &mut W, source: &S) -> fmt::Result
where
    W: Write + ?Sized,
    S: StatusSource + ?Sized,
{
    out.write_str("Pin OUTPUT INPUT\r\n")?;
    for pin in source.pins() {
        let level = u8::from(pin.high);
        write!(out, " {:>2}  ", pin.label)?;
        match pin.mode {
            PinMode::Output => write!(out, "  {level}     -   ")?,
            PinMode::Input => write!(out, "  -     {level}  ")?,
        }
        write!(out, "{}\r\n", pin.description)?;
    }
    Ok(())
}

fn config_form<W: Write + ?Sized>(out: &mut W, config: &ServerConfig) -> fmt::Result {
    write!(
        out,
        "<form action=\"{}\" method=\"post\"><input type=\"submit\" value=\"Submit\"></form>",
        config.redirect_location
    )
}

fn log_table<W, S>(out: &mut W, source: &S) -> fmt::Result
where
    W: Write + ?Sized,
    S: StatusSource + ?Sized,
{
    let mut empty = true;
    out.write_str("<table>")?;
    for (index, record) in source.log_records().enumerate() {
        write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>0x{:02X}</td><td>{}</td></tr>",
            index + 1,
            record.timestamp,
            record.code,
            record.description
        )?;
        empty = false;
    }
    out.write_str("</table>")?;
    if empty {
        out.write_str("Log empty")?;
    }
    Ok(())
}

fn storage_dump<W, S>(out: &mut W, source: &S) -> fmt::Result
where
    W: Write + ?Sized,
    S: StatusSource + ?Sized,
{
    out.write_str("<table><tr><td></td>")?;
    for column in 0..STORAGE_COLUMNS {
        write!(out, "<td><b>{column:02X}</b></td>")?;
    }
    out.write_str("</tr>")?;

    let storage = source.storage();
    for (row, line) in storage.chunks(STORAGE_COLUMNS).enumerate() {
        write!(out, "<tr><td><b>{row:02X}</b></td>")?;
        for value in line {
            write!(out, "<td>{value:02X}</td>")?;
        }
        out.write_str("</tr>")?;
    }
    out.write_str("</table>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{LogRecord, PinStatus, StaticStatus};

    fn render(resource: Resource, status: &StaticStatus) -> String {
        let mut page = String::new();
        render_page(&mut page, resource, status, &ServerConfig::default()).unwrap();
        page
    }

    #[test]
    fn resource_paths_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(Resource::from_path(resource.path()), Some(resource));
        }
        assert_eq!(Resource::from_path("/favicon.ico"), None);
        assert_eq!(Resource::from_path("/log/"), None);
    }

    #[test]
    fn page_skeleton() {
        let page = render(Resource::Config, &StaticStatus::default());

        assert!(page.starts_with("<html><h1>Growbox</h1><input type=\"button\""));
        assert!(page.contains("onclick=\"document.location='/storage'\" value=\"Storage dump\"/>"));
        assert!(page.contains("<hr/><pre>Free memory: 0 bytes\r\n"));
        assert!(page.contains("<form action=\"/\" method=\"post\">"));
        assert!(page.ends_with("</form></pre></html>"));
    }

    #[test]
    fn brief_status_lines() {
        let mut status = StaticStatus::default();
        status.boot.logger_enabled = true;
        status.boot.log_records = 3;
        status.boot.log_capacity = 100;
        status.boot.log_overflow = true;
        status.clock.is_day = false;
        status.clock.time = "21:15:00 01.05.2014".into();
        status.temperature.current = 22.5;

        let page = render(Resource::Status, &status);
        assert!(page.contains("Logger: enabled, records 3/100, overflow\r\n"));
        assert!(page.contains(
            "Clock: <b>NIGHT</b> mode, time 21:15:00 01.05.2014, up time [1:00], down time [17:00]"
        ));
        assert!(page.contains(
            "Temperature: current 22.50, next 0.00 (count 0), day 24.00+/-3.00, \
             night 18.00+/-6.00, critical 40.00\r\n"
        ));
    }

    #[test]
    fn pin_rows() {
        let status = StaticStatus {
            pins: vec![
                PinStatus {
                    label: "04".into(),
                    mode: PinMode::Output,
                    high: true,
                    description: "Relay: light on(0)/off(1)".into(),
                },
                PinStatus {
                    label: "A0".into(),
                    mode: PinMode::Input,
                    high: false,
                    description: String::new(),
                },
            ],
            ..StaticStatus::default()
        };

        let page = render(Resource::Status, &status);
        assert!(page.contains("Pin OUTPUT INPUT\r\n 04    1     -   Relay: light on(0)/off(1)\r\n"));
        assert!(page.contains(" A0    -     0  \r\n"));
    }

    #[test]
    fn empty_log() {
        let page = render(Resource::Log, &StaticStatus::default());
        assert!(page.contains("<pre><table></table>Log empty</pre>"));
    }

    #[test]
    fn log_rows_are_numbered() {
        let status = StaticStatus {
            log: vec![LogRecord {
                timestamp: "10:00:00".into(),
                code: 0x41,
                description: "Light on".into(),
            }],
            ..StaticStatus::default()
        };

        let page = render(Resource::Log, &status);
        assert!(page.contains(
            "<table><tr><td>1</td><td>10:00:00</td><td>0x41</td><td>Light on</td></tr></table>"
        ));
        assert!(!page.contains("Log empty"));
    }

    #[test]
    fn storage_rows_hold_sixteen_cells() {
        let status = StaticStatus {
            storage: (0u8..20).collect(),
            ..StaticStatus::default()
        };

        let page = render(Resource::Storage, &status);
        assert!(page.contains("<td><b>0F</b></td></tr><tr><td><b>00</b></td><td>00</td>"));
        assert!(page.contains("<tr><td><b>01</b></td><td>10</td><td>11</td><td>12</td><td>13</td></tr></table>"));
    }

    #[test]
    fn stops_at_first_write_error() {
        struct Limited(String, usize);

        impl Write for Limited {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                if self.0.len() + s.len() > self.1 {
                    return Err(fmt::Error);
                }
                self.0.push_str(s);
                Ok(())
            }
        }

        let mut out = Limited(String::new(), 40);
        let result = render_page(
            &mut out,
            Resource::Status,
            &StaticStatus::default(),
            &ServerConfig::default(),
        );
        assert!(result.is_err());
        assert!(out.0.len() <= 40);
    }
}
