//!
//! Crate allows to attach [Emitter](async_event_emitter::Emitter) operations to any structure
//! holding an emitter in a named field
//!
//! The derive implements [HasEmitter](async_event_emitter::HasEmitter) for the structure and
//! adds inherent methods forwarding to the field's emitter. By default all operations are
//! forwarded, ```method``` entries restrict them to the listed ones.
//! Unknown operation names are rejected, and a forwarded name clashing with a method the structure
//! already has fails to compile as a duplicate definition.
//!
//! Usage sample:
//! ```
//! use async_event_emitter::{Emitter, Listener};
//! use async_event_emitter_derive::Emitter;
//!
//! #[derive(Emitter, Default)]
//! #[emitter(field = events, method = subscribe, method = listener_count)]
//! struct Button {
//!     events: Emitter<u32>,
//! }
//!
//! let button = Button::default();
//! button.subscribe("click", &Listener::new(|_| async { Ok(()) }));
//! assert_eq!(button.listener_count(None), 1);
//! ```
//!
//! Rejected configurations:
//! ```compile_fail
//! # use async_event_emitter::Emitter;
//! # use async_event_emitter_derive::Emitter;
//! #[derive(Emitter)]
//! #[emitter(field = events, method = emit)]
//! struct UnknownMethod {
//!     events: Emitter<u32>,
//! }
//! ```
//! ```compile_fail
//! # use async_event_emitter::Emitter;
//! # use async_event_emitter_derive::Emitter;
//! #[derive(Emitter)]
//! #[emitter(field = events, method = subscribe)]
//! #[emitter(method = subscribe)]
//! struct ListedTwice {
//!     events: Emitter<u32>,
//! }
//! ```
//! ```compile_fail
//! # use async_event_emitter::Emitter;
//! # use async_event_emitter_derive::Emitter;
//! #[derive(Emitter)]
//! struct MissingField {
//!     events: Emitter<u32>,
//! }
//! ```
//! ```compile_fail
//! # use async_event_emitter::Emitter;
//! # use async_event_emitter_derive::Emitter;
//! #[derive(Emitter)]
//! #[emitter(field = bus)]
//! struct NoSuchField {
//!     events: Emitter<u32>,
//! }
//! ```
//! ```compile_fail
//! # use async_event_emitter::Emitter;
//! # use async_event_emitter_derive::Emitter;
//! #[derive(Emitter)]
//! #[emitter(field = events, method = listener_count)]
//! struct Collision {
//!     events: Emitter<u32>,
//! }
//!
//! impl Collision {
//!     fn listener_count(&self) -> usize {
//!         0
//!     }
//! }
//! ```
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    parse::ParseStream, parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, Token,
    Type,
};

extern crate proc_macro;

const METHODS: [&str; 10] = [
    "subscribe",
    "unsubscribe",
    "subscribe_once",
    "emit_concurrent",
    "emit_serial",
    "subscribe_any",
    "unsubscribe_any",
    "clear_listeners",
    "listener_count",
    "bind_methods",
];

#[proc_macro_derive(Emitter, attributes(emitter))]
pub fn derive_emitter(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input: DeriveInput = parse_macro_input!(input);
    match derive_emitter_impl(input) {
        Ok(stream) => stream,
        Err(e) => e.into_compile_error(),
    }
    .into()
}

fn derive_emitter_impl(input: DeriveInput) -> syn::Result<TokenStream> {
    let EmitterAttrs { field, mut methods } = EmitterAttrs::from_attrs(&input.attrs)?;
    let field = field.ok_or_else(|| {
        syn::Error::new(
            input.ident.span(),
            "Missing #[emitter(field = ...)] attribute naming the emitter field",
        )
    })?;
    let field_ty = field_type(&input, &field)?;
    if methods.is_empty() {
        methods = METHODS
            .iter()
            .map(|m| Ident::new(m, Span::call_site()))
            .collect();
    }
    let forwards = methods.iter().map(forward_method);

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::async_event_emitter::HasEmitter for #ident #ty_generics #where_clause {
            type Payload = <#field_ty as ::async_event_emitter::HasEmitter>::Payload;
            fn emitter(&self) -> &::async_event_emitter::Emitter<Self::Payload> {
                ::async_event_emitter::HasEmitter::emitter(&self.#field)
            }
        }

        impl #impl_generics #ident #ty_generics #where_clause {
            #(#forwards)*
        }
    })
}

fn field_type<'a>(input: &'a DeriveInput, name: &Ident) -> syn::Result<&'a Type> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Emitter)] requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Emitter)] can be used on structs only",
            ))
        }
    };
    fields
        .named
        .iter()
        .find(|f| f.ident.as_ref() == Some(name))
        .map(|f| &f.ty)
        .ok_or_else(|| syn::Error::new(name.span(), format!("No field `{name}` in the struct")))
}

fn forward_method(method: &Ident) -> TokenStream {
    let emitter = quote!(::async_event_emitter::HasEmitter::emitter(self));
    let payload = quote!(<Self as ::async_event_emitter::HasEmitter>::Payload);
    let doc = format!("Forwards to [async_event_emitter::Emitter::{method}]");
    let body = match method.to_string().as_str() {
        "subscribe" => quote! {
            pub fn subscribe(
                &self,
                event: &str,
                listener: &::async_event_emitter::Listener<#payload>,
            ) -> ::async_event_emitter::Unsubscribe {
                #emitter.subscribe(event, listener)
            }
        },
        "unsubscribe" => quote! {
            pub fn unsubscribe(&self, event: &str, listener: &::async_event_emitter::Listener<#payload>) {
                #emitter.unsubscribe(event, listener)
            }
        },
        "subscribe_once" => quote! {
            pub fn subscribe_once(&self, event: &str) -> ::async_event_emitter::Once<#payload> {
                #emitter.subscribe_once(event)
            }
        },
        "emit_concurrent" => quote! {
            pub fn emit_concurrent(&self, event: &str, payload: #payload) -> ::async_event_emitter::Emission {
                #emitter.emit_concurrent(event, payload)
            }
        },
        "emit_serial" => quote! {
            pub fn emit_serial(&self, event: &str, payload: #payload) -> ::async_event_emitter::Emission {
                #emitter.emit_serial(event, payload)
            }
        },
        "subscribe_any" => quote! {
            pub fn subscribe_any(
                &self,
                listener: &::async_event_emitter::AnyListener<#payload>,
            ) -> ::async_event_emitter::Unsubscribe {
                #emitter.subscribe_any(listener)
            }
        },
        "unsubscribe_any" => quote! {
            pub fn unsubscribe_any(&self, listener: &::async_event_emitter::AnyListener<#payload>) {
                #emitter.unsubscribe_any(listener)
            }
        },
        "clear_listeners" => quote! {
            pub fn clear_listeners(&self, event: ::std::option::Option<&str>) {
                #emitter.clear_listeners(event)
            }
        },
        "listener_count" => quote! {
            pub fn listener_count(&self, event: ::std::option::Option<&str>) -> usize {
                #emitter.listener_count(event)
            }
        },
        "bind_methods" => quote! {
            pub fn bind_methods<B: ::async_event_emitter::BindTarget<#payload>>(
                &self,
                target: &mut B,
                methods: ::std::option::Option<&[&str]>,
            ) -> ::async_event_emitter::Result<()> {
                #emitter.bind_methods(target, methods)
            }
        },
        // names are checked against METHODS while parsing
        _ => unreachable!(),
    };
    quote! {
        #[doc = #doc]
        #body
    }
}

/// Entries of all ```#[emitter(key = value, ...)]``` attributes of the structure
#[derive(Default)]
struct EmitterAttrs {
    field: Option<Ident>,
    methods: Vec<Ident>,
}

impl EmitterAttrs {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut res = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path.is_ident("emitter")) {
            attr.parse_args_with(|input: ParseStream| res.parse_entries(input))?;
        }
        Ok(res)
    }

    fn parse_entries(&mut self, input: ParseStream) -> syn::Result<()> {
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: Ident = input.parse()?;
            self.set(key, value)?;
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: Ident, value: Ident) -> syn::Result<()> {
        if key == "field" {
            if self.field.is_some() {
                return Err(syn::Error::new(key.span(), "Duplicate 'field' parameter"));
            }
            self.field = Some(value);
        } else if key == "method" {
            if !METHODS.iter().any(|m| value == m) {
                return Err(syn::Error::new(
                    value.span(),
                    format!("`{value}` is not an emitter method"),
                ));
            }
            if self.methods.contains(&value) {
                return Err(syn::Error::new(
                    value.span(),
                    format!("Method `{value}` listed twice"),
                ));
            }
            self.methods.push(value);
        } else {
            return Err(syn::Error::new(
                key.span(),
                "Unexpected parameter. Allowed values are 'field' and 'method'",
            ));
        }
        Ok(())
    }
}
