use super::record::{absolute_name, parse_rdata, parse_ttl};
use super::{Result, Zone, ZoneError, ZoneRecord, constants};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A whitespace-separated field of a zone file line. Quoted strings keep
/// their inner text, escapes are left for the rdata parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
}

/// A record or directive after parentheses have been joined
#[derive(Debug)]
struct LogicalLine {
    number: usize,
    text: String,
    /// Started with whitespace, so the owner is inherited
    indented: bool,
}

/// RFC 1035 zone file parser
pub struct ZoneParser {
    /// Origin the zone was requested under
    zone_origin: String,
    /// Origin relative names are completed with, changed by `$ORIGIN`
    current_origin: String,
    /// Value of the last `$TTL`
    default_ttl: Option<u32>,
    /// Last TTL given explicitly on a record
    last_ttl: Option<u32>,
    last_owner: Option<String>,
    current_class: DNSResourceClass,
    include_depth: usize,
}

impl ZoneParser {
    /// Create a parser for the zone rooted at `origin`
    pub fn new(origin: &str) -> Self {
        let origin = normalize_origin(origin);
        Self {
            zone_origin: origin.clone(),
            current_origin: origin,
            default_ttl: None,
            last_ttl: None,
            last_owner: None,
            current_class: DNSResourceClass::IN,
            include_depth: 0,
        }
    }

    /// Parse and validate a zone file from path
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Zone> {
        let path = path.as_ref();
        let contents = read_zone_file(path)?;

        let mut zone = Zone::new(&self.zone_origin);
        zone.file_path = Some(path.to_string_lossy().to_string());
        self.parse_into(&contents, path.parent(), None, &mut zone)?;
        self.finish(zone)
    }

    /// Parse and validate zone file contents. `$INCLUDE` paths are taken
    /// relative to the working directory.
    pub fn parse(&mut self, contents: &str) -> Result<Zone> {
        let mut zone = Zone::new(&self.zone_origin);
        self.parse_into(contents, None, None, &mut zone)?;
        self.finish(zone)
    }

    fn finish(&self, zone: Zone) -> Result<Zone> {
        zone.validate()?;
        debug!(
            "Parsed zone {} with {} records in {} record sets",
            zone.origin,
            zone.stats().total_records,
            zone.len()
        );
        Ok(zone)
    }

    fn parse_into(
        &mut self,
        contents: &str,
        base_dir: Option<&Path>,
        source: Option<&str>,
        zone: &mut Zone,
    ) -> Result<()> {
        let at_line = |number: usize, msg: String| match source {
            Some(file) => ZoneError::ParseError(format!("{} line {}: {}", file, number, msg)),
            None => ZoneError::ParseError(format!("Line {}: {}", number, msg)),
        };
        let wrap = |number: usize, e: ZoneError| match e {
            ZoneError::ParseError(msg) => at_line(number, msg),
            other => at_line(number, other.to_string()),
        };

        for line in logical_lines(contents).map_err(|(n, msg)| at_line(n, msg))? {
            trace!("Parsing line {}: {}", line.number, line.text);
            let tokens = tokenize(&line.text).map_err(|msg| at_line(line.number, msg))?;
            if tokens.is_empty() {
                continue;
            }

            if !line.indented && !tokens[0].quoted && tokens[0].text.starts_with('$') {
                self.parse_directive(&tokens, base_dir, zone)
                    .map_err(|e| wrap(line.number, e))?;
                continue;
            }

            let record = match self.parse_record(&tokens, line.indented) {
                Ok(record) => record,
                Err(ZoneError::UnsupportedType(rtype)) => {
                    warn!(
                        "Skipping {} record at line {}: only the \\# generic form is supported",
                        rtype, line.number
                    );
                    zone.skipped_records += 1;
                    continue;
                }
                Err(e) => return Err(wrap(line.number, e)),
            };
            self.add_to_zone(record, zone)
                .map_err(|e| wrap(line.number, e))?;
        }

        Ok(())
    }

    fn add_to_zone(&self, record: ZoneRecord, zone: &mut Zone) -> Result<()> {
        if !zone.contains_name(&record.name) {
            warn!(
                "Ignoring {} {} record outside of zone {}",
                record.name, record.rtype, zone.origin
            );
            return Ok(());
        }
        zone.add_record(record)
    }

    fn parse_directive(
        &mut self,
        tokens: &[Token],
        base_dir: Option<&Path>,
        zone: &mut Zone,
    ) -> Result<()> {
        let directive = tokens[0].text.to_uppercase();
        match directive.as_str() {
            "$ORIGIN" => {
                let name = tokens.get(1).ok_or_else(|| {
                    ZoneError::ParseError("$ORIGIN requires domain name".to_string())
                })?;
                self.current_origin = absolute_name(&name.text, &self.current_origin)?;
                debug!("Set origin to: {}", self.current_origin);
            }
            "$TTL" => {
                let value = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::ParseError("$TTL requires value".to_string()))?;
                let ttl = parse_ttl(&value.text)?;
                self.default_ttl = Some(ttl);
                debug!("Set default TTL to: {}", ttl);
            }
            "$INCLUDE" => {
                let file = tokens.get(1).ok_or_else(|| {
                    ZoneError::ParseError("$INCLUDE requires file path".to_string())
                })?;
                let origin = tokens
                    .get(2)
                    .map(|t| absolute_name(&t.text, &self.current_origin))
                    .transpose()?;
                self.include(&file.text, origin, base_dir, zone)?;
            }
            "$GENERATE" => self.generate(&tokens[1..], zone)?,
            _ => {
                return Err(ZoneError::ParseError(format!(
                    "Unknown directive: {}",
                    tokens[0].text
                )));
            }
        }

        Ok(())
    }

    fn include(
        &mut self,
        file: &str,
        origin: Option<String>,
        base_dir: Option<&Path>,
        zone: &mut Zone,
    ) -> Result<()> {
        if self.include_depth >= constants::MAX_INCLUDE_DEPTH {
            return Err(ZoneError::ParseError(format!(
                "$INCLUDE nested deeper than {} levels",
                constants::MAX_INCLUDE_DEPTH
            )));
        }

        let path = match base_dir {
            Some(dir) if Path::new(file).is_relative() => dir.join(file),
            _ => PathBuf::from(file),
        };
        debug!("Processing $INCLUDE {} {:?}", path.display(), origin);

        let contents = read_zone_file(&path).map_err(|e| {
            ZoneError::ParseError(format!(
                "Failed to read include file {}: {}",
                path.display(),
                e
            ))
        })?;

        // The included file starts with the given origin and cannot change ours
        let saved_origin = self.current_origin.clone();
        let saved_owner = self.last_owner.take();
        if let Some(origin) = origin {
            self.current_origin = origin;
        }

        self.include_depth += 1;
        let source = path.display().to_string();
        let result = self.parse_into(&contents, path.parent(), Some(&source), zone);
        self.include_depth -= 1;

        self.current_origin = saved_origin;
        self.last_owner = saved_owner;
        result
    }

    /// `$GENERATE start-stop[/step] lhs [ttl] [class] type rhs`
    fn generate(&mut self, args: &[Token], zone: &mut Zone) -> Result<()> {
        if args.len() < 4 {
            return Err(ZoneError::ParseError(
                "$GENERATE requires range, lhs, type, and rhs".to_string(),
            ));
        }

        let (start, stop, step) = parse_generate_range(&args[0].text)?;
        let lhs = &args[1].text;
        let (ttl, class, rtype, rest) = self.parse_fields(&args[2..])?;
        let rtype = rtype
            .ok_or_else(|| ZoneError::ParseError("$GENERATE requires a record type".into()))?;
        let rhs = rest
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if rhs.is_empty() {
            return Err(ZoneError::ParseError("$GENERATE requires rhs".to_string()));
        }

        let mut count = 0;
        let mut i = start;
        while i <= stop {
            let name = expand_generate_template(lhs, i)?;
            let rdata = expand_generate_template(&rhs, i)?;

            let owner = absolute_name(&name, &self.current_origin)?;
            let tokens = tokenize(&rdata).map_err(ZoneError::ParseError)?;
            let rdata = parse_rdata(rtype, &tokens, &self.current_origin)?;
            let record = ZoneRecord::new(owner, self.resolve_ttl(ttl), class, rtype, rdata);
            self.add_to_zone(record, zone)?;

            count += 1;
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        debug!("Generated {} records from $GENERATE", count);
        Ok(())
    }

    /// Parse a resource record line
    fn parse_record(&mut self, tokens: &[Token], indented: bool) -> Result<ZoneRecord> {
        let (owner, fields) = if indented {
            let owner = self.last_owner.clone().ok_or_else(|| {
                ZoneError::ParseError("Record without owner and no previous owner".to_string())
            })?;
            (owner, tokens)
        } else {
            (
                absolute_name(&tokens[0].text, &self.current_origin)?,
                &tokens[1..],
            )
        };

        let (ttl, class, rtype, rdata_tokens) = self.parse_fields(fields)?;
        let rtype =
            rtype.ok_or_else(|| ZoneError::ParseError("Missing record type".to_string()))?;

        // A skipped record still sets the defaults for the lines after it
        self.last_owner = Some(owner.clone());
        if let Some(ttl) = ttl {
            self.last_ttl = Some(ttl);
        }
        self.current_class = class;

        let rdata = parse_rdata(rtype, rdata_tokens, &self.current_origin)?;

        Ok(ZoneRecord::new(
            owner,
            self.resolve_ttl(ttl),
            class,
            rtype,
            rdata,
        ))
    }

    /// Reads optional TTL and class, in either order, then the type.
    /// Returns the remaining tokens as rdata.
    #[allow(clippy::type_complexity)]
    fn parse_fields<'t>(
        &self,
        fields: &'t [Token],
    ) -> Result<(
        Option<u32>,
        DNSResourceClass,
        Option<DNSResourceType>,
        &'t [Token],
    )> {
        let mut ttl = None;
        let mut class = None;
        let mut idx = 0;

        while let Some(field) = fields.get(idx) {
            idx += 1;
            if ttl.is_none() {
                if let Ok(value) = parse_ttl(&field.text) {
                    ttl = Some(value);
                    continue;
                }
            }
            if class.is_none() {
                if let Ok(parsed) = field.text.parse::<DNSResourceClass>() {
                    class = Some(parsed);
                    continue;
                }
            }
            let rtype = field
                .text
                .parse::<DNSResourceType>()
                .map_err(|_| ZoneError::InvalidRRType(field.text.clone()))?;
            return Ok((
                ttl,
                class.unwrap_or(self.current_class),
                Some(rtype),
                &fields[idx..],
            ));
        }

        Ok((
            ttl,
            class.unwrap_or(self.current_class),
            None,
            &fields[fields.len()..],
        ))
    }

    /// Explicit TTL, then `$TTL`, then the last explicit TTL, then the default
    fn resolve_ttl(&self, explicit: Option<u32>) -> u32 {
        explicit
            .or(self.default_ttl)
            .or(self.last_ttl)
            .unwrap_or(constants::DEFAULT_TTL)
    }
}

fn normalize_origin(origin: &str) -> String {
    let origin = origin.trim().to_ascii_lowercase();
    if origin.ends_with('.') {
        origin
    } else {
        format!("{}.", origin)
    }
}

fn read_zone_file(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| ZoneError::IoError(e.to_string()))?;
    if metadata.len() as usize > constants::MAX_ZONE_FILE_SIZE {
        return Err(ZoneError::FileTooLarge);
    }
    fs::read_to_string(path).map_err(|e| ZoneError::IoError(e.to_string()))
}

/// Strips comments and joins parenthesised continuation lines.
/// Errors carry the line number they refer to.
fn logical_lines(contents: &str) -> std::result::Result<Vec<LogicalLine>, (usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<LogicalLine> = None;
    let mut depth = 0usize;

    for (idx, raw) in contents.lines().enumerate() {
        let number = idx + 1;
        let mut text = String::with_capacity(raw.len());
        let mut in_quotes = false;
        let mut escaped = false;

        for ch in raw.chars() {
            if escaped {
                escaped = false;
                text.push(ch);
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => in_quotes = !in_quotes,
                ';' if !in_quotes => break,
                '(' if !in_quotes => depth += 1,
                ')' if !in_quotes => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| (number, "Unbalanced ')'".to_string()))?;
                }
                _ => {}
            }
            text.push(ch);
        }

        match current.as_mut() {
            Some(line) => {
                line.text.push(' ');
                line.text.push_str(&text);
            }
            None => {
                if text.trim().is_empty() {
                    continue;
                }
                current = Some(LogicalLine {
                    number,
                    indented: text.starts_with([' ', '\t']),
                    text,
                });
            }
        }

        if depth == 0 {
            if let Some(line) = current.take() {
                lines.push(line);
            }
        }
    }

    if let Some(line) = current {
        return Err((
            line.number,
            format!("Unclosed parentheses starting at line {}", line.number),
        ));
    }

    Ok(lines)
}

/// Splits a logical line into tokens. Parentheses act as separators
/// outside quotes.
fn tokenize(line: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '\\' => {
                    current.push(ch);
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '"' => {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted: true,
                    });
                    in_quotes = false;
                }
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            ' ' | '\t' | '(' | ')' => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted: false,
                    });
                    in_token = false;
                }
            }
            '"' => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted: false,
                    });
                    in_token = false;
                }
                in_quotes = true;
            }
            '\\' => {
                in_token = true;
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            _ => {
                in_token = true;
                current.push(ch);
            }
        }
    }

    if in_quotes {
        return Err("Unterminated quoted string".to_string());
    }
    if in_token {
        tokens.push(Token {
            text: current,
            quoted: false,
        });
    }

    Ok(tokens)
}

/// Parse $GENERATE range specification, `start-stop[/step]`
fn parse_generate_range(range_str: &str) -> Result<(u32, u32, u32)> {
    let (range, step) = match range_str.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (range_str, None),
    };

    let (start_str, stop_str) = range.split_once('-').ok_or_else(|| {
        ZoneError::ParseError("$GENERATE range must contain '-'".to_string())
    })?;
    let start = start_str.parse::<u32>().map_err(|_| {
        ZoneError::ParseError(format!("Invalid $GENERATE start: {}", start_str))
    })?;
    let stop = stop_str
        .parse::<u32>()
        .map_err(|_| ZoneError::ParseError(format!("Invalid $GENERATE stop: {}", stop_str)))?;
    let step = match step {
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| ZoneError::ParseError(format!("Invalid $GENERATE step: {}", s)))?,
        None => 1,
    };

    if start > stop {
        return Err(ZoneError::ParseError(
            "$GENERATE start must be <= stop".to_string(),
        ));
    }
    if step == 0 {
        return Err(ZoneError::ParseError(
            "$GENERATE step must be > 0".to_string(),
        ));
    }

    Ok((start, stop, step))
}

/// Substitutes `$` and `${offset,width,base}` with the iterator value.
fn expand_generate_template(template: &str, value: u32) -> Result<String> {
    let mut result = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                result.push(ch);
                result.push(next);
            }
            continue;
        }
        if ch != '$' {
            result.push(ch);
            continue;
        }
        if chars.peek() != Some(&'{') {
            result.push_str(&value.to_string());
            continue;
        }
        chars.next();

        let mut modifier = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '}' {
                closed = true;
                break;
            }
            modifier.push(ch);
        }
        if !closed {
            return Err(ZoneError::ParseError(
                "Unclosed ${} in $GENERATE".to_string(),
            ));
        }

        let mut parts = modifier.split(',');
        let offset = parts
            .next()
            .unwrap_or("0")
            .parse::<i64>()
            .map_err(|_| ZoneError::ParseError(format!("Invalid offset in ${{{}}}", modifier)))?;
        let width = parts
            .next()
            .unwrap_or("0")
            .parse::<usize>()
            .map_err(|_| ZoneError::ParseError(format!("Invalid width in ${{{}}}", modifier)))?;
        let base = parts.next().unwrap_or("d");

        let adjusted = value as i64 + offset;
        if adjusted < 0 {
            return Err(ZoneError::ParseError(format!(
                "$GENERATE offset makes {} negative",
                value
            )));
        }
        let formatted = match base {
            "d" => format!("{:0width$}", adjusted, width = width),
            "o" => format!("{:0width$o}", adjusted, width = width),
            "x" => format!("{:0width$x}", adjusted, width = width),
            "X" => format!("{:0width$X}", adjusted, width = width),
            _ => {
                return Err(ZoneError::ParseError(format!(
                    "Invalid base '{}', expected d, o, x, or X",
                    base
                )));
            }
        };
        result.push_str(&formatted);
    }

    Ok(result)
}
