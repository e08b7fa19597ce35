//! Declarative extraction of `<metadata>` fields.
//!
//! A [`FieldTemplate`] names an element (qualified, e.g. `dc:creator`), the
//! attributes it must carry, and what to pull out of a match. The
//! [`MetadataEngine`] records every element each template matches, then
//! builds values on demand so one bad field never blocks the others.

use bitflags::bitflags;

use super::index::ContentIndex;
use super::item::ContentItem;
use super::xml::Element;
use crate::error::{Error, Result};
use crate::util::normalize_href;

bitflags! {
    /// Independent extraction capabilities of a template or attribute matcher.
    ///
    /// On a template, the value flags apply to the element text; on an
    /// attribute matcher, to the attribute value. `REQUIRED` and `UNIQUE`
    /// are only meaningful on templates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u8 {
        /// Take the element's text content.
        const TEXT = 1 << 0;
        /// Take the attribute value literally.
        const ATTR = 1 << 1;
        /// The value is a manifest id. Alone: emit that item's package path.
        const ID_REF = 1 << 2;
        /// The value points at a content item; emit the item itself. With
        /// `ID_REF` the value is a manifest id, otherwise a package path
        /// (falling back to a manifest id).
        const ITEM_REF = 1 << 3;
        /// Zero matches is an error for this field.
        const REQUIRED = 1 << 4;
        /// More than one match is an error for this field.
        const UNIQUE = 1 << 5;

        const CAPTURE = Self::TEXT.bits()
            | Self::ATTR.bits()
            | Self::ID_REF.bits()
            | Self::ITEM_REF.bits();
    }
}

/// What an attribute must look like for an element to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrRule {
    /// The attribute must exist.
    Present,
    /// The attribute must exist and equal this literal.
    Equals(String),
    /// The attribute may be missing; captured when present.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatcher {
    pub name: String,
    pub rule: AttrRule,
    pub flags: FieldFlags,
}

impl AttrMatcher {
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: AttrRule::Present,
            flags: FieldFlags::empty(),
        }
    }

    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: AttrRule::Equals(value.into()),
            flags: FieldFlags::empty(),
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: AttrRule::Optional,
            flags: FieldFlags::ATTR,
        }
    }

    /// Capture this attribute's value with the given flags.
    pub fn capture(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    fn matches(&self, element: &Element) -> bool {
        match (&self.rule, element.attr(&self.name)) {
            (AttrRule::Optional, _) => true,
            (AttrRule::Present, found) => found.is_some(),
            (AttrRule::Equals(expected), found) => found == Some(expected.as_str()),
        }
    }

    fn captures(&self) -> bool {
        self.flags.intersects(FieldFlags::CAPTURE)
    }
}

/// Rule for one named metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTemplate {
    /// Unique name the field is queried by.
    pub name: String,
    /// Qualified element name, compared exactly.
    pub element: String,
    pub attributes: Vec<AttrMatcher>,
    /// Literal the element's `id` attribute must equal.
    pub id: Option<String>,
    pub flags: FieldFlags,
}

impl FieldTemplate {
    pub fn new(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element: element.into(),
            attributes: Vec::new(),
            id: None,
            flags: FieldFlags::empty(),
        }
    }

    pub fn attr(mut self, matcher: AttrMatcher) -> Self {
        self.attributes.push(matcher);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn matches(&self, element: &Element) -> bool {
        element.name == self.element
            && self.attributes.iter().all(|m| m.matches(element))
            && self
                .id
                .as_deref()
                .is_none_or(|id| element.attr("id") == Some(id))
    }
}

/// The standard Dublin Core and OPF fields.
pub fn builtin_templates() -> Vec<FieldTemplate> {
    use FieldFlags as F;
    vec![
        FieldTemplate::new("title", "dc:title").flags(F::REQUIRED | F::TEXT),
        FieldTemplate::new("author", "dc:creator")
            .attr(AttrMatcher::equals("opf:role", "aut"))
            .flags(F::REQUIRED | F::TEXT),
        FieldTemplate::new("identifier", "dc:identifier")
            .attr(AttrMatcher::optional("opf:scheme"))
            .flags(F::REQUIRED | F::TEXT),
        FieldTemplate::new("language", "dc:language").flags(F::REQUIRED | F::TEXT),
        FieldTemplate::new("description", "dc:description").flags(F::TEXT),
        FieldTemplate::new("date", "dc:date")
            .attr(AttrMatcher::present("opf:event").capture(F::ATTR))
            .flags(F::TEXT),
        FieldTemplate::new("date-of-publication", "dc:date")
            .attr(AttrMatcher::equals("opf:event", "publication"))
            .flags(F::TEXT),
        FieldTemplate::new("date-of-modification", "dc:date")
            .attr(AttrMatcher::equals("opf:event", "modification"))
            .flags(F::TEXT),
        FieldTemplate::new("cover", "meta")
            .attr(AttrMatcher::equals("name", "cover"))
            .attr(AttrMatcher::present("content").capture(F::ITEM_REF | F::ID_REF))
            .flags(F::REQUIRED | F::UNIQUE),
    ]
}

/// One extracted value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Text(String),
    Item(&'a ContentItem),
    /// An optional attribute that was not present.
    Absent,
    /// Several captured sources of one element, in template order.
    Tuple(Vec<Value<'a>>),
}

impl<'a> Value<'a> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&'a ContentItem> {
        match self {
            Self::Item(item) => Some(*item),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value<'a>]> {
        match self {
            Self::Tuple(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}

/// Result of querying a field: one value per matched element.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    One(Value<'a>),
    Many(Vec<Value<'a>>),
}

impl<'a> FieldValue<'a> {
    /// First value in document order.
    pub fn first(&self) -> Option<&Value<'a>> {
        self.values().first()
    }

    pub fn values(&self) -> &[Value<'a>] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Every field extracted in one pass, plus the per-field failures.
#[derive(Debug, Default)]
pub struct MetadataReport<'a> {
    /// Fields with at least one value, in template registration order.
    pub values: Vec<(String, FieldValue<'a>)>,
    pub errors: Vec<Error>,
}

impl<'a> MetadataReport<'a> {
    pub fn get(&self, name: &str) -> Option<&FieldValue<'a>> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Registry of field templates and the elements each one matched.
#[derive(Debug, Clone, Default)]
pub struct MetadataEngine {
    templates: Vec<FieldTemplate>,
    /// Parallel to `templates`.
    matches: Vec<Vec<Element>>,
    metadata: Option<Element>,
}

impl MetadataEngine {
    /// Engine with the [`builtin_templates`] registered.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        for template in builtin_templates() {
            engine.templates.push(template);
            engine.matches.push(Vec::new());
        }
        engine
    }

    /// Engine with no templates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a template. Names must be unique.
    ///
    /// If a metadata section was already scanned, the new template is matched
    /// against it straight away.
    pub fn register(&mut self, template: FieldTemplate) -> Result<()> {
        if self.template(&template.name).is_some() {
            return Err(Error::DuplicateTemplate(template.name));
        }
        let found = match &self.metadata {
            Some(metadata) => {
                metadata.descendants().filter(|e| template.matches(e)).cloned().collect()
            }
            None => Vec::new(),
        };
        self.templates.push(template);
        self.matches.push(found);
        Ok(())
    }

    pub fn template(&self, name: &str) -> Option<&FieldTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn templates(&self) -> &[FieldTemplate] {
        &self.templates
    }

    /// Match every element below `metadata` against every template.
    ///
    /// Replaces the results of any earlier scan.
    pub fn scan(&mut self, metadata: Option<&Element>) {
        self.metadata = metadata.cloned();
        for found in &mut self.matches {
            found.clear();
        }
        let Some(metadata) = metadata else {
            return;
        };
        for element in metadata.descendants() {
            for (template, found) in self.templates.iter().zip(&mut self.matches) {
                if template.matches(element) {
                    found.push(element.clone());
                }
            }
        }
    }

    /// Elements matched by the named template, in document order.
    pub fn matches(&self, name: &str) -> &[Element] {
        self.templates
            .iter()
            .position(|t| t.name == name)
            .map(|i| self.matches[i].as_slice())
            .unwrap_or_default()
    }

    /// Build the value of one field.
    ///
    /// `Ok(None)` when no template has that name, or when an optional field
    /// matched nothing.
    pub fn get<'a>(&self, name: &str, index: &'a ContentIndex) -> Result<Option<FieldValue<'a>>> {
        let Some(position) = self.templates.iter().position(|t| t.name == name) else {
            return Ok(None);
        };
        self.build(&self.templates[position], &self.matches[position], index)
    }

    /// Build every registered field, collecting failures instead of stopping.
    pub fn extract_all<'a>(&self, index: &'a ContentIndex) -> MetadataReport<'a> {
        let mut report = MetadataReport::default();
        for (template, found) in self.templates.iter().zip(&self.matches) {
            match self.build(template, found, index) {
                Ok(Some(value)) => report.values.push((template.name.clone(), value)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(field = %template.name, error = %e, "Skipping metadata field");
                    report.errors.push(e);
                }
            }
        }
        report
    }

    fn build<'a>(
        &self,
        template: &FieldTemplate,
        found: &[Element],
        index: &'a ContentIndex,
    ) -> Result<Option<FieldValue<'a>>> {
        if found.is_empty() {
            if template.flags.contains(FieldFlags::REQUIRED) {
                return Err(Error::MissingRequiredField(template.name.clone()));
            }
            return Ok(None);
        }
        if found.len() > 1 && template.flags.contains(FieldFlags::UNIQUE) {
            return Err(Error::DuplicateUniqueField {
                field: template.name.clone(),
                count: found.len(),
            });
        }

        let mut values = found
            .iter()
            .map(|element| element_value(template, element, index))
            .collect::<Result<Vec<_>>>()?;

        if values.len() == 1 {
            Ok(values.pop().map(FieldValue::One))
        } else {
            Ok(Some(FieldValue::Many(values)))
        }
    }
}

/// Text first, then each capturing attribute, flattened when only one.
fn element_value<'a>(
    template: &FieldTemplate,
    element: &Element,
    index: &'a ContentIndex,
) -> Result<Value<'a>> {
    let mut sources = Vec::new();
    if template.flags.intersects(FieldFlags::CAPTURE) {
        sources.push(resolve(element.text(), template.flags, index)?);
    }
    for matcher in template.attributes.iter().filter(|m| m.captures()) {
        let value = match element.attr(&matcher.name) {
            Some(raw) => resolve(raw.to_string(), matcher.flags, index)?,
            None => Value::Absent,
        };
        sources.push(value);
    }

    if sources.len() == 1 {
        Ok(sources.remove(0))
    } else {
        Ok(Value::Tuple(sources))
    }
}

fn resolve(raw: String, flags: FieldFlags, index: &ContentIndex) -> Result<Value<'_>> {
    let item_ref = flags.contains(FieldFlags::ITEM_REF);
    let id_ref = flags.contains(FieldFlags::ID_REF);

    if item_ref && id_ref {
        return index.by_manifest_id(&raw).map(Value::Item);
    }
    if item_ref {
        return index
            .by_package_path(&normalize_href(&raw))
            .or_else(|_| index.by_manifest_id(&raw))
            .map(Value::Item);
    }
    if id_ref {
        let item = index.by_manifest_id(&raw)?;
        let path = item.package_path.as_ref().unwrap_or(&item.root_path);
        return Ok(Value::Text(path.clone()));
    }
    Ok(Value::Text(raw))
}
