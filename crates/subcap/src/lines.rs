/// Iterator over the physical lines of a text, accepting `\n`, `\r\n` and a
/// lone `\r` as terminators. A missing final terminator is fine; a final
/// terminator does not produce a trailing empty line.
#[derive(Debug, Clone)]
pub(crate) struct PhysicalLines<'a> {
    rest: &'a str,
}

pub(crate) fn physical_lines(text: &str) -> PhysicalLines<'_> {
    PhysicalLines { rest: text }
}

impl<'a> Iterator for PhysicalLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        match self.rest.find(|c| c == '\r' || c == '\n') {
            Some(idx) => {
                let line = &self.rest[..idx];
                let terminator = if self.rest[idx..].starts_with("\r\n") {
                    2
                } else {
                    1
                };
                self.rest = &self.rest[idx + terminator..];
                Some(line)
            }
            None => {
                let line = self.rest;
                self.rest = "";
                Some(line)
            }
        }
    }
}
