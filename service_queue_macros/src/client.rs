use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse::{Parse, ParseStream},
    FnArg, GenericArgument, Ident, ItemTrait, Pat, PathArguments, ReturnType, TraitItem,
    TraitItemFn, Type,
};

pub struct ClientArgs {
    proxy: Option<Ident>,
}

impl Parse for ClientArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(Self { proxy: None });
        }
        Ok(Self {
            proxy: Some(input.parse()?),
        })
    }
}

pub fn expand(args: ClientArgs, item: ItemTrait) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "service client traits cannot be generic",
        ));
    }

    let trait_ident = &item.ident;
    let vis = &item.vis;
    let proxy_ident = args
        .proxy
        .unwrap_or_else(|| format_ident!("{}Proxy", trait_ident));

    let mut methods = Vec::new();
    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(expand_method(method)?),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "service client traits may only declare methods",
                ))
            }
        }
    }

    let doc = format!("Queue-backed implementation of [`{}`].", trait_ident);

    Ok(quote! {
        #item

        #[doc = #doc]
        #[derive(Clone, Debug)]
        #vis struct #proxy_ident {
            proxy: ::service_queue::ServiceProxy,
        }

        impl ::service_queue::ServiceClient for #proxy_ident {
            fn from_proxy(proxy: ::service_queue::ServiceProxy) -> Self {
                Self { proxy }
            }

            fn service_proxy(&self) -> &::service_queue::ServiceProxy {
                &self.proxy
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#methods)*
        }
    })
}

fn expand_method(method: &TraitItemFn) -> syn::Result<TokenStream2> {
    let sig = &method.sig;

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "service client methods cannot be generic",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "service client methods must be synchronous",
        ));
    }
    match sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                sig,
                "service client methods must take `&self`",
            ))
        }
    }

    let mut param_names = Vec::new();
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            match &*pat_type.pat {
                Pat::Ident(pat_ident) => param_names.push(&pat_ident.ident),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "service client parameters must be plain identifiers",
                    ))
                }
            }
        }
    }

    let method_name = sig.ident.to_string();
    // Parameters travel as a tuple; a trailing comma keeps (x,) a tuple.
    let args = quote! { &(#(#param_names,)*) };

    let body = match &sig.output {
        ReturnType::Default => quote! {
            self.proxy.call_detached(#method_name, #args);
        },
        ReturnType::Type(_, ty) => match result_ok_type(ty) {
            Some(ok) if is_unit(ok) => quote! {
                self.proxy
                    .call(#method_name, #args)
                    .map_err(::core::convert::Into::into)
            },
            Some(ok) => quote! {
                self.proxy
                    .call_and_wait::<#ok, _>(#method_name, #args)
                    .map_err(::core::convert::Into::into)
            },
            None => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "service client methods must return nothing or a `Result`",
                ))
            }
        },
    };

    Ok(quote! {
        #sig {
            #body
        }
    })
}

/// The `T` of a `Result<T, ..>` return type.
fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(generic_args) = &segment.arguments else {
        return None;
    };
    generic_args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}
