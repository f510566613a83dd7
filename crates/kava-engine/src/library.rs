//! Library class declarations
//!
//! Built-in classes are declared with Java-like signature strings and an
//! implementation per method: a native closure, a step program, or an inline
//! template the compiler expands at the call site. Installing a set of
//! classes declares them in the [`TypeGraph`] and builds the dispatch table.

use crate::error::EngineResult;
use crate::exception::JavaException;
use crate::program::{Program, StepContext};
use crate::value::Value;
use kava_types::{
    ClassDeclaration, Field, Method, Parameter, PrimitiveType, PrimitiveValue, TypeError,
    TypeGraph, TypeId, TypeKind, TypeRef, Visibility,
};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Errors raised while installing library classes
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Cannot parse signature `{signature}`: {reason}")]
    InvalidSignature {
        signature: String,
        reason: &'static str,
    },

    #[error("Unknown type {name} in {owner}")]
    UnknownType { owner: String, name: String },

    #[error("Member {signature} declared twice in {class}")]
    DuplicateMember { class: String, signature: String },

    #[error("Template placeholder ${index} has no argument")]
    MissingTemplateArgument { index: usize },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Native method body; receives the receiver (if any) and the arguments, bottom first
pub type NativeFn =
    Arc<dyn Fn(&mut StepContext<'_>, &[Value]) -> EngineResult<NativeReturn> + Send + Sync>;

/// What a native method hands back to its caller
#[derive(Debug, Clone)]
pub enum NativeReturn {
    Void,
    Value(Value),
    Throw(Arc<JavaException>),
}

/// Body of a library method
#[derive(Clone)]
pub enum MethodImplementation {
    Native(NativeFn),
    Java(Arc<Program>),
    /// Source text with `$0` for the receiver and `$1..$n` for the arguments
    Template(String),
}

impl MethodImplementation {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>, &[Value]) -> EngineResult<NativeReturn> + Send + Sync + 'static,
    {
        MethodImplementation::Native(Arc::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MethodImplementation::Native(_) => "native",
            MethodImplementation::Java(_) => "java",
            MethodImplementation::Template(_) => "template",
        }
    }
}

impl fmt::Debug for MethodImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodImplementation::Native(_) => f.write_str("Native(..)"),
            MethodImplementation::Java(p) => write!(f, "Java({})", p.qualified_name),
            MethodImplementation::Template(t) => write!(f, "Template({:?})", t),
        }
    }
}

/// One member of a library class
#[derive(Debug, Clone)]
pub enum MemberDeclaration {
    Field {
        signature: String,
        constant: Option<PrimitiveValue>,
    },
    Method {
        signature: String,
        implementation: MethodImplementation,
    },
}

/// Declaration of a built-in class or interface
#[derive(Debug, Clone)]
pub struct LibraryClass {
    pub identifier: String,
    pub kind: TypeKind,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub type_parameters: Vec<String>,
    pub is_final: bool,
    pub members: Vec<MemberDeclaration>,
}

impl LibraryClass {
    pub fn class(identifier: impl Into<String>) -> Self {
        Self::with_kind(identifier, TypeKind::Class)
    }

    pub fn interface(identifier: impl Into<String>) -> Self {
        Self::with_kind(identifier, TypeKind::Interface)
    }

    fn with_kind(identifier: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            extends: None,
            implements: Vec::new(),
            type_parameters: Vec::new(),
            is_final: false,
            members: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn type_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_parameters = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn field(mut self, signature: impl Into<String>) -> Self {
        self.members.push(MemberDeclaration::Field {
            signature: signature.into(),
            constant: None,
        });
        self
    }

    pub fn constant(mut self, signature: impl Into<String>, value: PrimitiveValue) -> Self {
        self.members.push(MemberDeclaration::Field {
            signature: signature.into(),
            constant: Some(value),
        });
        self
    }

    pub fn method(mut self, signature: impl Into<String>, implementation: MethodImplementation) -> Self {
        self.members.push(MemberDeclaration::Method {
            signature: signature.into(),
            implementation,
        });
        self
    }

    pub fn native<F>(self, signature: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>, &[Value]) -> EngineResult<NativeReturn> + Send + Sync + 'static,
    {
        self.method(signature, MethodImplementation::native(f))
    }

    pub fn java(self, signature: impl Into<String>, program: Program) -> Self {
        self.method(signature, MethodImplementation::Java(Arc::new(program)))
    }

    pub fn template(self, signature: impl Into<String>, template: impl Into<String>) -> Self {
        self.method(signature, MethodImplementation::Template(template.into()))
    }
}

// ============================================================================
// Signature Parsing
// ============================================================================

/// A member signature split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub type_parameters: Vec<String>,
    /// Field type or method return type; `None` for constructors
    pub ty: Option<String>,
    pub name: String,
    /// `(type, name)`; the name is empty when the signature omits it
    pub parameters: Vec<(String, String)>,
}

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "default",
    "transient",
    "volatile",
];

/// Split on whitespace outside of `<...>`
fn split_top_level(text: &str, separator: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && separator(c) {
            if !current.trim().is_empty() {
                parts.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn invalid(signature: &str, reason: &'static str) -> LibraryError {
    LibraryError::InvalidSignature {
        signature: signature.to_string(),
        reason,
    }
}

/// Parse modifiers and generic parameters off the front of `tokens`
fn parse_head(signature: &str, tokens: &[String]) -> Result<(ParsedSignature, usize), LibraryError> {
    let mut parsed = ParsedSignature {
        visibility: Visibility::Package,
        is_static: false,
        is_final: false,
        is_abstract: false,
        type_parameters: Vec::new(),
        ty: None,
        name: String::new(),
        parameters: Vec::new(),
    };
    let mut i = 0;
    while let Some(token) = tokens.get(i) {
        let word = token.as_str();
        if let Some(visibility) = Visibility::from_keyword(word) {
            parsed.visibility = visibility;
        } else if word == "static" {
            parsed.is_static = true;
        } else if word == "final" {
            parsed.is_final = true;
        } else if word == "abstract" {
            parsed.is_abstract = true;
        } else if word.starts_with('<') {
            let inner = word
                .strip_prefix('<')
                .and_then(|w| w.strip_suffix('>'))
                .ok_or_else(|| invalid(signature, "unterminated type parameter list"))?;
            parsed.type_parameters = split_top_level(inner, |c| c == ',')
                .into_iter()
                .map(|p| p.split_whitespace().next().unwrap_or_default().to_string())
                .collect();
        } else if !MODIFIERS.contains(&word) {
            break;
        }
        i += 1;
    }
    Ok((parsed, i))
}

/// Parse `[modifiers] [<T>] [ReturnType] name(Type a, Type b)`
///
/// A signature without a return type declares a constructor.
pub fn parse_method_signature(signature: &str) -> Result<ParsedSignature, LibraryError> {
    let open = signature
        .find('(')
        .ok_or_else(|| invalid(signature, "missing parameter list"))?;
    let close = signature
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| invalid(signature, "unterminated parameter list"))?;
    let trailer = signature[close + 1..].trim();
    if !trailer.is_empty() && !trailer.starts_with("throws") {
        return Err(invalid(signature, "unexpected text after parameter list"));
    }

    let tokens = split_top_level(&signature[..open], char::is_whitespace);
    let (mut parsed, start) = parse_head(signature, &tokens)?;
    match &tokens[start..] {
        [name] => parsed.name = name.clone(),
        [ty, name] => {
            parsed.ty = Some(ty.clone());
            parsed.name = name.clone();
        }
        _ => return Err(invalid(signature, "expected return type and name")),
    }
    if !is_identifier(&parsed.name) {
        return Err(invalid(signature, "method name is not an identifier"));
    }

    for param in split_top_level(&signature[open + 1..close], |c| c == ',') {
        let words: Vec<String> = split_top_level(&param, char::is_whitespace)
            .into_iter()
            .filter(|w| w != "final")
            .collect();
        let (ty, name) = match words.as_slice() {
            [ty] => (ty.clone(), String::new()),
            [ty, name] => (ty.clone(), name.clone()),
            _ => return Err(invalid(signature, "malformed parameter")),
        };
        let ty = match ty.strip_suffix("...") {
            Some(element) => format!("{}[]", element),
            None => ty,
        };
        parsed.parameters.push((ty, name));
    }
    Ok(parsed)
}

/// Parse `[modifiers] Type name`
pub fn parse_field_signature(signature: &str) -> Result<ParsedSignature, LibraryError> {
    let tokens = split_top_level(signature, char::is_whitespace);
    let (mut parsed, start) = parse_head(signature, &tokens)?;
    match &tokens[start..] {
        [ty, name] if is_identifier(name) => {
            parsed.ty = Some(ty.clone());
            parsed.name = name.clone();
            Ok(parsed)
        }
        _ => Err(invalid(signature, "expected field type and name")),
    }
}

/// Resolve a type written in a signature
fn resolve_type(
    types: &TypeGraph,
    owner: &str,
    text: &str,
    type_parameters: &[String],
) -> Result<TypeRef, LibraryError> {
    if let Some(element) = text.strip_suffix("[]") {
        return Ok(TypeRef::Array(Box::new(resolve_type(
            types,
            owner,
            element.trim(),
            type_parameters,
        )?)));
    }
    if let Some(p) = PrimitiveType::from_name(text) {
        return Ok(TypeRef::Primitive(p));
    }
    if type_parameters.iter().any(|p| p == text) {
        return Ok(TypeRef::TypeVariable(text.to_string()));
    }
    let unknown = || LibraryError::UnknownType {
        owner: owner.to_string(),
        name: text.to_string(),
    };
    if let Some(open) = text.find('<') {
        let base = types.lookup(text[..open].trim()).ok_or_else(unknown)?;
        let inner = text[open + 1..]
            .strip_suffix('>')
            .ok_or_else(|| invalid(text, "unterminated type argument list"))?;
        let arguments = split_top_level(inner, |c| c == ',')
            .iter()
            .map(|a| resolve_type(types, owner, a, type_parameters))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(TypeRef::Generic(base, arguments));
    }
    types.lookup(text).map(TypeRef::Class).ok_or_else(unknown)
}

/// Expand an inline template
///
/// `$0` is the receiver and `$n` the n-th argument. Digits after `$` are read
/// greedily; a `$` not followed by a digit is kept as is.
pub fn expand_template(
    template: &str,
    receiver: Option<&str>,
    args: &[&str],
) -> Result<String, LibraryError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' || !chars.peek().is_some_and(|(_, d)| d.is_ascii_digit()) {
            out.push(c);
            continue;
        }
        let mut index = 0usize;
        while let Some(&(_, d)) = chars.peek() {
            let Some(digit) = d.to_digit(10) else { break };
            index = index.saturating_mul(10).saturating_add(digit as usize);
            chars.next();
        }
        let replacement = if index == 0 {
            receiver
        } else {
            args.get(index - 1).copied()
        };
        out.push_str(replacement.ok_or(LibraryError::MissingTemplateArgument { index })?);
    }
    Ok(out)
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug)]
struct ClassEntry {
    type_id: TypeId,
    /// Keyed by `name(type,type)`
    methods: FxHashMap<String, MethodImplementation>,
    constants: FxHashMap<String, PrimitiveValue>,
}

/// Implementations of every installed library method
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    classes: FxHashMap<String, ClassEntry>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `classes` in `types` and record their implementations
    ///
    /// All classes are declared before any supertype or member is resolved,
    /// so declaration order within one call does not matter. On error neither
    /// `types` nor the registry is changed.
    pub fn install(&mut self, types: &mut TypeGraph, classes: Vec<LibraryClass>) -> Result<(), LibraryError> {
        let mut staged = types.clone();
        let entries = self.stage(&mut staged, classes)?;
        *types = staged;
        for (identifier, entry) in entries {
            tracing::debug!(
                class = identifier.as_str(),
                methods = entry.methods.len(),
                "installed library class"
            );
            self.classes.insert(identifier, entry);
        }
        Ok(())
    }

    fn stage(
        &self,
        types: &mut TypeGraph,
        classes: Vec<LibraryClass>,
    ) -> Result<Vec<(String, ClassEntry)>, LibraryError> {
        let mut declared = Vec::with_capacity(classes.len());
        for class in &classes {
            let decl = match class.kind {
                TypeKind::Interface => ClassDeclaration::interface(&class.identifier),
                TypeKind::Enum => ClassDeclaration::enumeration(&class.identifier),
                TypeKind::Class => ClassDeclaration::class(&class.identifier),
            }
            .with_visibility(Visibility::Public)
            .with_type_parameters(class.type_parameters.iter().cloned())
            .with_final(class.is_final);
            declared.push(types.declare(decl)?);
        }

        for (class, &id) in classes.iter().zip(&declared) {
            self.link_supertypes(types, class, id)?;
        }

        classes
            .into_iter()
            .zip(declared)
            .map(|(class, id)| {
                let identifier = class.identifier.clone();
                Ok((identifier, build_entry(types, class, id)?))
            })
            .collect()
    }

    fn link_supertypes(&self, types: &mut TypeGraph, class: &LibraryClass, id: TypeId) -> Result<(), LibraryError> {
        let resolve = |name: &str| {
            types.lookup(name).ok_or_else(|| LibraryError::UnknownType {
                owner: class.identifier.clone(),
                name: name.to_string(),
            })
        };
        let parent = match (&class.extends, class.kind) {
            (Some(parent), _) => Some(resolve(parent)?),
            (None, TypeKind::Interface) => None,
            (None, _) => types.lookup("Object").filter(|object| *object != id),
        };
        let interfaces = class
            .implements
            .iter()
            .map(|i| resolve(i))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(parent) = parent {
            if class.kind == TypeKind::Interface {
                types.add_interface(id, parent)?;
            } else {
                types.set_superclass(id, parent)?;
            }
        }
        for interface in interfaces {
            types.add_interface(id, interface)?;
        }
        Ok(())
    }

    /// Implementation declared directly on `class`
    pub fn method(&self, class: &str, signature: &str) -> Option<&MethodImplementation> {
        self.classes.get(class)?.methods.get(signature)
    }

    /// Implementation for a receiver of type `ty`
    ///
    /// Walks the superclass chain first, then every other supertype.
    pub fn dispatch(&self, types: &TypeGraph, ty: TypeId, signature: &str) -> Option<&MethodImplementation> {
        let mut current = Some(ty);
        while let Some(id) = current {
            let class = types.get(id).ok()?;
            if let Some(found) = self.method(&class.identifier, signature) {
                return Some(found);
            }
            current = class.superclass;
        }
        types
            .ancestors(ty)
            .iter()
            .find_map(|name| self.method(name, signature))
    }

    pub fn constant(&self, class: &str, field: &str) -> Option<&PrimitiveValue> {
        self.classes.get(class)?.constants.get(field)
    }

    pub fn type_of(&self, class: &str) -> Option<TypeId> {
        self.classes.get(class).map(|c| c.type_id)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

fn build_entry(types: &mut TypeGraph, class: LibraryClass, id: TypeId) -> Result<ClassEntry, LibraryError> {
    let mut entry = ClassEntry {
        type_id: id,
        methods: FxHashMap::default(),
        constants: FxHashMap::default(),
    };
    let owner = class.identifier.as_str();

    for member in class.members {
        match member {
            MemberDeclaration::Field { signature, constant } => {
                let parsed = parse_field_signature(&signature)?;
                let text = parsed.ty.as_deref().unwrap_or_default();
                let ty = resolve_type(types, owner, text, &class.type_parameters)?;
                let mut field = Field::new(&parsed.name, ty)
                    .with_visibility(parsed.visibility)
                    .with_static(parsed.is_static);
                if let Some(value) = constant {
                    entry.constants.insert(parsed.name.clone(), value.clone());
                    field = field.with_constant(value);
                }
                types.add_field(id, field)?;
            }
            MemberDeclaration::Method {
                signature,
                implementation,
            } => {
                let parsed = parse_method_signature(&signature)?;
                let mut scope = class.type_parameters.clone();
                scope.extend(parsed.type_parameters.iter().cloned());

                let mut method = match &parsed.ty {
                    None => Method::constructor(&parsed.name),
                    Some(ret) => Method::new(&parsed.name)
                        .returning(resolve_type(types, owner, ret, &scope)?),
                }
                .with_visibility(parsed.visibility)
                .with_static(parsed.is_static)
                .with_abstract(parsed.is_abstract);
                for (ty, name) in &parsed.parameters {
                    let ty = resolve_type(types, owner, ty, &scope)?;
                    method = method.with_parameter(Parameter::new(name, ty));
                }

                let key = types.method_signature(&method);
                if entry.methods.contains_key(&key) {
                    return Err(LibraryError::DuplicateMember {
                        class: owner.to_string(),
                        signature: key,
                    });
                }
                types.add_method(id, method)?;
                entry.methods.insert(key, implementation);
            }
        }
    }

    Ok(entry)
}
