/// What a generated property access refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Helper,
    Context,
    Data,
    Partial,
}

/// Produces the JavaScript expression that reads `name` from the object held
/// by `parent` (itself a JavaScript expression such as `helpers` or `depth0`).
///
/// Every helper, partial, context and data access in generated code goes
/// through this seam, which lets callers observe what a template uses.
pub trait NameLookup {
    fn name_lookup(&mut self, parent: &str, name: &str, kind: LookupKind) -> String;
}

/// Guarded own-property access through the runtime's `lookupProperty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNameLookup;

impl NameLookup for DefaultNameLookup {
    fn name_lookup(&mut self, parent: &str, name: &str, _kind: LookupKind) -> String {
        format!("lookupProperty({parent},{})", quoted_string(name))
    }
}

impl<L: NameLookup + ?Sized> NameLookup for &mut L {
    fn name_lookup(&mut self, parent: &str, name: &str, kind: LookupKind) -> String {
        (**self).name_lookup(parent, name, kind)
    }
}

/// A JSON string literal that is also safe inside JavaScript source.
pub fn quoted_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
