//! Declarative schema of the standard dialect and the engine that walks it.
//!
//! The schema is immutable data. The engine keeps its own position stack of
//! child sets, so one [`Schema`] can serve any number of concurrent loads.

use dm_core::{eq_ignore_case, ByteField, ClassField, FieldAction, RowFlags};
use tracing::debug;

use crate::context::ParseContext;
use crate::tokenizer::{AttributeList, XmlHandler};
use crate::{ParseError, ParseErrorKind, DM_LEVEL, DM_XML_VERSION};

/// What happens to a resolved attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrAction {
    /// The value must equal the literal, ignoring case.
    Expect(&'static str),
    /// The value is written into the current row.
    Write(FieldAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    /// Absence of a required attribute rejects the document.
    pub required: bool,
    /// `None` only gates presence.
    pub action: Option<AttrAction>,
}

/// Hook run when an element starts or ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementHook {
    BeginRow,
    EndRow,
    /// Decode the element text into the current row.
    Text(FieldAction),
}

/// Children of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    /// Bottom of the tree: no element may appear here.
    Leaf,
    Set(&'static [ElementDescriptor]),
}

/// Result of resolving a tag name in a child set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Bottom,
    Unknown,
    Found(&'static ElementDescriptor),
}

impl Children {
    /// Resolve `name` ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Lookup {
        match *self {
            Children::Leaf => Lookup::Bottom,
            Children::Set(elements) => elements
                .iter()
                .find(|elem| eq_ignore_case(elem.name, name))
                .map_or(Lookup::Unknown, Lookup::Found),
        }
    }

    pub fn elements(&self) -> &'static [ElementDescriptor] {
        match *self {
            Children::Leaf => &[],
            Children::Set(elements) => elements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub name: &'static str,
    /// Informational: the engine only rejects unknown elements, it does not
    /// enforce presence.
    pub required: bool,
    pub on_start: Option<ElementHook>,
    pub on_end: Option<ElementHook>,
    pub attributes: &'static [AttributeDescriptor],
    pub children: Children,
}

impl ElementDescriptor {
    const fn leaf(name: &'static str, required: bool) -> Self {
        Self {
            name,
            required,
            on_start: None,
            on_end: None,
            attributes: &[],
            children: Children::Leaf,
        }
    }

    const fn with_attributes(mut self, attributes: &'static [AttributeDescriptor]) -> Self {
        self.attributes = attributes;
        self
    }

    const fn on_end(mut self, hook: ElementHook) -> Self {
        self.on_end = Some(hook);
        self
    }
}

/// A complete dialect tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub root: Children,
}

const fn required(name: &'static str, action: AttrAction) -> AttributeDescriptor {
    AttributeDescriptor {
        name,
        required: true,
        action: Some(action),
    }
}

const fn write(action: FieldAction) -> AttrAction {
    AttrAction::Write(action)
}

static ENABLED_OADDR: [AttributeDescriptor; 1] =
    [required("enabled", write(FieldAction::Flag(RowFlags::CHECK_OADDR)))];
static ENABLED_HARDCODED: [AttributeDescriptor; 1] =
    [required("enabled", write(FieldAction::Flag(RowFlags::HARDCODED)))];
static ENABLED_ZONE: [AttributeDescriptor; 1] =
    [required("enabled", write(FieldAction::Flag(RowFlags::MATCH_ZONE)))];
static ENABLED_SUBZONE: [AttributeDescriptor; 1] =
    [required("enabled", write(FieldAction::Flag(RowFlags::MATCH_SUB_ZONE)))];
static MASK_ATTRS: [AttributeDescriptor; 2] = [
    required("class", write(FieldAction::Class(ClassField::Mask))),
    required("type", write(FieldAction::Byte(ByteField::TypeMask))),
];
static FILTER_ATTRS: [AttributeDescriptor; 2] = [
    required("class", write(FieldAction::Class(ClassField::Filter))),
    required("type", write(FieldAction::Byte(ByteField::TypeFilter))),
];

static ROW_CHILDREN: [ElementDescriptor; 9] = [
    ElementDescriptor::leaf("description", false),
    ElementDescriptor::leaf("oaddr", true)
        .with_attributes(&ENABLED_OADDR)
        .on_end(ElementHook::Text(FieldAction::Byte(ByteField::Oaddr))),
    ElementDescriptor::leaf("hardcoded", true).with_attributes(&ENABLED_HARDCODED),
    ElementDescriptor::leaf("mask", true).with_attributes(&MASK_ATTRS),
    ElementDescriptor::leaf("filter", true).with_attributes(&FILTER_ATTRS),
    ElementDescriptor::leaf("zone", true).with_attributes(&ENABLED_ZONE),
    ElementDescriptor::leaf("subzone", true).with_attributes(&ENABLED_SUBZONE),
    ElementDescriptor::leaf("action", true)
        .on_end(ElementHook::Text(FieldAction::Byte(ByteField::Action))),
    ElementDescriptor::leaf("param", true)
        .on_end(ElementHook::Text(FieldAction::Byte(ByteField::Param))),
];

static ROW_ATTRS: [AttributeDescriptor; 1] =
    [required("enabled", write(FieldAction::Flag(RowFlags::ENABLE)))];

static DM_CHILDREN: [ElementDescriptor; 1] = [ElementDescriptor {
    name: "row",
    required: false,
    on_start: Some(ElementHook::BeginRow),
    on_end: Some(ElementHook::EndRow),
    attributes: &ROW_ATTRS,
    children: Children::Set(&ROW_CHILDREN),
}];

static DM_ATTRS: [AttributeDescriptor; 3] = [
    required("version", AttrAction::Expect(DM_XML_VERSION)),
    required("level", AttrAction::Expect(DM_LEVEL)),
    required("type", AttrAction::Expect("std")),
];

static STANDARD_ROOT: [ElementDescriptor; 1] = [ElementDescriptor {
    name: "dm",
    required: true,
    on_start: None,
    on_end: None,
    attributes: &DM_ATTRS,
    children: Children::Set(&DM_CHILDREN),
}];

/// Standard decision matrix dialect.
pub static STANDARD: Schema = Schema {
    name: "standard",
    root: Children::Set(&STANDARD_ROOT),
};

/// Generic validating walker over a [`Schema`].
#[derive(Debug)]
pub(crate) struct SchemaEngine<'a> {
    /// Active child set on top; one entry per open element plus the root.
    stack: Vec<Children>,
    pub(crate) ctx: ParseContext<'a>,
}

impl<'a> SchemaEngine<'a> {
    pub(crate) fn new(schema: &Schema, ctx: ParseContext<'a>) -> Self {
        Self {
            stack: vec![schema.root],
            ctx,
        }
    }

    fn active(&self) -> Children {
        self.stack.last().copied().unwrap_or(Children::Leaf)
    }

    fn resolve(&self, name: &str, line: u64) -> Result<&'static ElementDescriptor, ParseError> {
        match self.active().lookup(name) {
            Lookup::Found(elem) => Ok(elem),
            Lookup::Bottom => Err(ParseError::new(
                line,
                ParseErrorKind::BottomOfTree(name.to_string()),
            )),
            Lookup::Unknown => Err(ParseError::new(
                line,
                ParseErrorKind::UnknownElement(name.to_string()),
            )),
        }
    }

    fn handle_start(
        &mut self,
        name: &str,
        attrs: &AttributeList,
        line: u64,
    ) -> Result<(), ParseError> {
        let elem = self.resolve(name, line)?;
        debug!(line, element = elem.name, depth = self.ctx.depth(), "element start");

        // Presence is checked for every declared attribute before anything
        // is written, and the start hook runs before attribute writes so a
        // freshly opened row is not cleared afterwards.
        let mut resolved = Vec::with_capacity(elem.attributes.len());
        for attr in elem.attributes {
            match attrs.find(attr.name) {
                Some(value) => resolved.push((attr, value)),
                None if attr.required => {
                    return Err(ParseError::new(
                        line,
                        ParseErrorKind::MissingAttribute {
                            element: name.to_string(),
                            attribute: attr.name,
                        },
                    ))
                }
                None => debug!(line, attribute = attr.name, "optional attribute absent"),
            }
        }

        if let Some(hook) = elem.on_start {
            self.run_hook(hook, name, line)?;
        }

        for (attr, value) in resolved {
            debug!(line, attribute = attr.name, value, "attribute");
            match attr.action {
                Some(AttrAction::Expect(expected)) if !eq_ignore_case(value, expected) => {
                    return Err(ParseError::new(
                        line,
                        ParseErrorKind::Mismatch {
                            attribute: attr.name,
                            expected,
                            found: value.to_string(),
                        },
                    ));
                }
                Some(AttrAction::Write(action)) => self
                    .ctx
                    .writer
                    .apply(action, value)
                    .map_err(|err| ParseError::codec(line, name, err))?,
                Some(AttrAction::Expect(_)) | None => {}
            }
        }

        self.stack.push(elem.children);
        self.ctx.descend();
        Ok(())
    }

    fn handle_end(&mut self, name: &str, line: u64) -> Result<(), ParseError> {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        let elem = self.resolve(name, line)?;
        debug!(line, element = elem.name, depth = self.ctx.depth(), "element end");
        if let Some(hook) = elem.on_end {
            self.run_hook(hook, name, line)?;
        }
        self.ctx.ascend();
        Ok(())
    }

    fn run_hook(&mut self, hook: ElementHook, name: &str, line: u64) -> Result<(), ParseError> {
        let result = match hook {
            ElementHook::BeginRow => self.ctx.writer.begin_row(),
            ElementHook::EndRow => self.ctx.writer.end_row(),
            ElementHook::Text(action) => self.ctx.apply_text(action),
        };
        result.map_err(|err| ParseError::codec(line, name, err))
    }
}

impl XmlHandler for SchemaEngine<'_> {
    fn start_element(&mut self, name: &str, attrs: &AttributeList, line: u64) {
        if self.ctx.is_aborted() {
            return;
        }
        self.ctx.clear_text();
        if let Err(err) = self.handle_start(name, attrs, line) {
            self.ctx.abort(err);
        }
    }

    fn end_element(&mut self, name: &str, line: u64) {
        if self.ctx.is_aborted() {
            return;
        }
        if let Err(err) = self.handle_end(name, line) {
            self.ctx.abort(err);
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

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::{CodecError, MatrixRow, TableWriter};

    use crate::tokenizer::tokenize;

    fn run(xml: &str, rows: &mut [MatrixRow]) -> Result<usize, ParseError> {
        let mut engine = SchemaEngine::new(&STANDARD, ParseContext::new(TableWriter::new(rows)));
        let tokenized = tokenize(xml, &mut engine);
        engine.ctx.finish(tokenized)
    }

    fn row(body: &str) -> String {
        format!(r#"<dm version="1.0" level="1" type="std"><row enabled="true">{body}</row></dm>"#)
    }

    #[test]
    fn lookup_ignores_case() {
        for name in ["ROW", "Row", "row"] {
            assert!(matches!(
                STANDARD.root.elements()[0].children.lookup(name),
                Lookup::Found(elem) if elem.name == "row"
            ));
        }
        assert_eq!(STANDARD.root.lookup("rows"), Lookup::Unknown);
        assert_eq!(Children::Leaf.lookup("row"), Lookup::Bottom);
    }

    #[test]
    fn every_branch_ends_in_leaves() {
        fn walk(children: Children, depth: usize) {
            assert!(depth < 4, "schema deeper than expected");
            for elem in children.elements() {
                assert!(!elem.name.is_empty());
                walk(elem.children, depth + 1);
            }
        }
        walk(STANDARD.root, 0);
        let row = STANDARD.root.elements()[0].children.elements()[0];
        assert!(row
            .children
            .elements()
            .iter()
            .all(|child| child.children == Children::Leaf));
    }

    #[test]
    fn engine_is_reentrant_over_one_schema() {
        let xml = row(r#"<action>7</action>"#);
        let mut first = [MatrixRow::default(); 1];
        let mut second = [MatrixRow::default(); 1];
        assert_eq!(run(&xml, &mut first), Ok(1));
        assert_eq!(run(&xml, &mut second), Ok(1));
        assert_eq!(first, second);
        assert_eq!(first[0].action, 7);
    }

    #[test]
    fn mixed_case_tags_are_accepted() {
        let xml = r#"<DM version="1.0" level="1" type="STD"><Row enabled="TRUE"><ACTION>3</ACTION></Row><ROW enabled="false"/></DM>"#;
        let mut rows = [MatrixRow::default(); 2];
        assert_eq!(run(xml, &mut rows), Ok(2));
        assert!(rows[0].is_enabled());
        assert_eq!(rows[0].action, 3);
        assert!(!rows[1].is_enabled());
    }

    #[test]
    fn element_below_leaf_hits_bottom_of_tree() {
        let mut rows = [MatrixRow::default(); 1];
        let err = run(&row("<param><x/></param>"), &mut rows).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::BottomOfTree("x".into()));
    }

    #[test]
    fn unknown_element_is_rejected() {
        let mut rows = [MatrixRow::default(); 1];
        let err = run(&row("<colour/>"), &mut rows).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownElement("colour".into()));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn missing_required_attribute() {
        let mut rows = [MatrixRow::default(); 1];
        let err = run(&row(r#"<mask class="1"/>"#), &mut rows).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingAttribute {
                element: "mask".into(),
                attribute: "type"
            }
        );
    }

    #[test]
    fn extra_attributes_are_ignored() {
        let mut rows = [MatrixRow::default(); 1];
        let xml = row(r#"<zone enabled="true" colour="red"/>"#);
        assert_eq!(run(&xml, &mut rows), Ok(1));
    }

    #[test]
    fn text_hooks_need_text() {
        let mut rows = [MatrixRow::default(); 1];
        let err = run(&row("<oaddr enabled=\"true\"></oaddr>"), &mut rows).unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::Codec {
                source: CodecError::MissingValue("oaddr"),
                ..
            }
        ));
    }

    #[test]
    fn text_does_not_leak_into_next_element() {
        let mut rows = [MatrixRow::default(); 1];
        let err = run(&row("<action>5</action><param/>"), &mut rows).unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::Codec {
                source: CodecError::MissingValue("param"),
                ..
            }
        ));
    }

    #[test]
    fn dm_attributes_must_match() {
        let mut rows = [MatrixRow::default(); 1];
        for (xml, attribute) in [
            (r#"<dm version="2.0" level="1" type="std"/>"#, "version"),
            (r#"<dm version="1.0" level="2" type="std"/>"#, "level"),
            (r#"<dm version="1.0" level="1" type="ext"/>"#, "type"),
        ] {
            let err = run(xml, &mut rows).unwrap_err();
            assert!(
                matches!(err.kind, ParseErrorKind::Mismatch { attribute: a, .. } if a == attribute),
                "{xml}: {err}"
            );
        }
    }
}
