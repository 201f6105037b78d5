//! Validator for the extended dialect.
//!
//! Legality here depends on attribute values (`row type`, `byte id`), which
//! the declarative schema cannot express, so nesting is tracked with explicit
//! context flags instead of a tree position. Row writes still go through the
//! shared [`dm_core::TableWriter`].

use dm_core::{
    eq_ignore_case, parse_unsigned, ByteField, ClassField, FieldAction, RowFlags, RowKind,
    ZoneField,
};
use tracing::{debug, warn};

use crate::context::ParseContext;
use crate::tokenizer::{AttributeList, XmlHandler};
use crate::{ParseError, ParseErrorKind, DM_LEVEL, DM_XML_VERSION};

/// Hand-written state machine for `<dm type="ext">` documents.
#[derive(Debug)]
pub(crate) struct ExtendedValidator<'a> {
    pub(crate) ctx: ParseContext<'a>,
    dm_found: bool,
    row_found: bool,
    data_found: bool,
}

/// Resolve a required attribute or fail with the element name.
fn required<'v>(
    attrs: &'v AttributeList,
    element: &str,
    attribute: &'static str,
    line: u64,
) -> Result<&'v str, ParseError> {
    attrs.find(attribute).ok_or_else(|| {
        ParseError::new(
            line,
            ParseErrorKind::MissingAttribute {
                element: element.to_string(),
                attribute,
            },
        )
    })
}

fn invalid(line: u64, reason: impl Into<String>) -> ParseError {
    ParseError::new(line, ParseErrorKind::InvalidStructure(reason.into()))
}

impl<'a> ExtendedValidator<'a> {
    pub(crate) fn new(ctx: ParseContext<'a>) -> Self {
        Self {
            ctx,
            dm_found: false,
            row_found: false,
            data_found: false,
        }
    }

    fn write(
        &mut self,
        action: FieldAction,
        value: &str,
        element: &str,
        line: u64,
    ) -> Result<(), ParseError> {
        self.ctx
            .writer
            .apply(action, value)
            .map_err(|err| ParseError::codec(line, element, err))
    }

    fn write_attr(
        &mut self,
        attrs: &AttributeList,
        element: &str,
        attribute: &'static str,
        action: FieldAction,
        line: u64,
    ) -> Result<(), ParseError> {
        let value = required(attrs, element, attribute, line)?;
        self.write(action, value, element, line)
    }

    fn write_text(&mut self, action: FieldAction, element: &str, line: u64) -> Result<(), ParseError> {
        self.ctx
            .apply_text(action)
            .map_err(|err| ParseError::codec(line, element, err))
    }

    fn check_dm(&self, attrs: &AttributeList, line: u64) -> Result<(), ParseError> {
        for (attribute, expected) in [
            ("version", DM_XML_VERSION),
            ("level", DM_LEVEL),
            ("type", "ext"),
        ] {
            let found = required(attrs, "dm", attribute, line)?;
            if !eq_ignore_case(found, expected) {
                return Err(ParseError::new(
                    line,
                    ParseErrorKind::Mismatch {
                        attribute,
                        expected,
                        found: found.to_string(),
                    },
                ));
            }
        }
        Ok(())
    }

    fn handle_start(
        &mut self,
        name: &str,
        attrs: &AttributeList,
        line: u64,
    ) -> Result<(), ParseError> {
        let tag = name.to_ascii_lowercase();
        debug!(line, element = name, depth = self.ctx.depth(), "element start");

        if tag == "dm" {
            self.dm_found = true;
            return self.check_dm(attrs, line);
        }
        if !self.dm_found {
            return Err(invalid(line, format!("<{name}> outside <dm>")));
        }
        if tag == "row" {
            if self.row_found {
                return Err(invalid(line, "<row> inside <row>"));
            }
            self.row_found = true;
            self.ctx
                .writer
                .begin_row()
                .map_err(|err| ParseError::codec(line, name, err))?;
            self.write_attr(attrs, name, "enabled", FieldAction::Flag(RowFlags::ENABLE), line)?;
            return self.write_attr(attrs, name, "type", FieldAction::Kind, line);
        }
        if !self.row_found {
            return Err(invalid(line, format!("<{name}> outside <row>")));
        }

        match tag.as_str() {
            "mask" => {
                self.write_attr(attrs, name, "class", FieldAction::Class(ClassField::Mask), line)?;
                self.write_attr(attrs, name, "type", FieldAction::Byte(ByteField::TypeMask), line)
            }
            "filter" => {
                self.write_attr(attrs, name, "class", FieldAction::Class(ClassField::Filter), line)?;
                self.write_attr(attrs, name, "type", FieldAction::Byte(ByteField::TypeFilter), line)
            }
            "zone" => {
                self.write_attr(attrs, name, "enabled", FieldAction::Flag(RowFlags::MATCH_ZONE), line)
            }
            "subzone" => self.write_attr(
                attrs,
                name,
                "enabled",
                FieldAction::Flag(RowFlags::MATCH_SUB_ZONE),
                line,
            ),
            "oaddr" => {
                self.write_attr(attrs, name, "enabled", FieldAction::Flag(RowFlags::CHECK_OADDR), line)
            }
            "hardcoded" => {
                self.write_attr(attrs, name, "enabled", FieldAction::Flag(RowFlags::HARDCODED), line)
            }
            "action" | "param" | "description" => Ok(()),
            "data" => {
                if self.ctx.writer.kind() != RowKind::Extended {
                    return Err(invalid(line, "<data> in a row of type std"));
                }
                self.data_found = true;
                Ok(())
            }
            "byte" => {
                if !self.data_found {
                    return Err(invalid(line, "<byte> outside <data>"));
                }
                let id = required(attrs, name, "id", line)?;
                let byte = self
                    .ctx
                    .writer
                    .select_data_byte(parse_unsigned(id))
                    .map_err(|err| ParseError::codec(line, name, err))?;
                debug!(line, id = byte.id(), "data byte selected");
                self.write_attr(attrs, name, "enabled", FieldAction::DataMatch, line)
            }
            _ => {
                warn!(line, element = name, "unknown element in extended row ignored");
                Ok(())
            }
        }
    }

    fn handle_end(&mut self, name: &str, line: u64) -> Result<(), ParseError> {
        let tag = name.to_ascii_lowercase();
        debug!(line, element = name, depth = self.ctx.depth(), "element end");

        if tag == "dm" {
            self.dm_found = false;
            return Ok(());
        }
        if !self.dm_found {
            return Err(invalid(line, format!("</{name}> outside <dm>")));
        }
        if tag == "row" {
            self.ctx
                .writer
                .end_row()
                .map_err(|err| ParseError::codec(line, name, err))?;
            self.row_found = false;
            self.data_found = false;
            return Ok(());
        }
        if !self.row_found {
            return Err(invalid(line, format!("</{name}> outside <row>")));
        }

        match tag.as_str() {
            "zone" => self.write_text(FieldAction::Zone(ZoneField::Zone), name, line),
            "subzone" => self.write_text(FieldAction::Zone(ZoneField::SubZone), name, line),
            "action" => self.write_text(FieldAction::Byte(ByteField::Action), name, line),
            "param" => self.write_text(FieldAction::Byte(ByteField::Param), name, line),
            "oaddr" => self.write_text(FieldAction::Byte(ByteField::Oaddr), name, line),
            "data" => {
                self.data_found = false;
                Ok(())
            }
            "byte" => {
                if !self.data_found {
                    return Err(invalid(line, "</byte> outside <data>"));
                }
                // The value is optional: a byte may only carry its match flag.
                if self.ctx.has_text() {
                    self.write_text(FieldAction::DataByte, name, line)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

impl XmlHandler for ExtendedValidator<'_> {
    fn start_element(&mut self, name: &str, attrs: &AttributeList, line: u64) {
        if self.ctx.is_aborted() {
            return;
        }
        self.ctx.clear_text();
        match self.handle_start(name, attrs, line) {
            Ok(()) => self.ctx.descend(),
            Err(err) => self.ctx.abort(err),
        }
    }

    fn end_element(&mut self, name: &str, line: u64) {
        if self.ctx.is_aborted() {
            return;
        }
        match self.handle_end(name, line) {
            Ok(()) => self.ctx.ascend(),
            Err(err) => self.ctx.abort(err),
        }
    }

    fn text(&mut self, text: &str, _line: u64) {
        if !self.ctx.is_aborted() {
            self.ctx.set_text(text);
        }
    }

    fn is_aborted(&self) -> bool {
        self.ctx.is_aborted()
    }
}
