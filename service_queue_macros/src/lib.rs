mod client;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait};

// ============================================================================
// #[service_client] attribute macro
// ============================================================================

/// Attribute macro that generates a queue-backed implementation of a client
/// interface trait.
///
/// The trait is emitted unchanged, followed by a `<Trait>Proxy` struct that
/// implements it (and `ServiceClient`) by turning each call into a task on
/// the bound service queue. The method name becomes the task's method name
/// and the parameters become its positional arguments.
///
/// # Usage
///
/// ```ignore
/// #[service_client]
/// pub trait HiringClient {
///     // no return type: fire-and-forget, enqueue failures are logged
///     fn hire_employee(&self, employee: Employee);
///
///     // Result<(), E>: fire-and-forget, enqueue failures are returned
///     fn reset(&self) -> Result<(), QueueError>;
///
///     // Result<T, E>: blocks until the task has run, decodes T
///     fn headcount(&self) -> Result<u32, QueueError>;
/// }
///
/// let client: HiringClientProxy = queue.create_proxy();
/// ```
///
/// Name the generated struct explicitly with `#[service_client(MyProxy)]`.
///
/// Every method must take `&self`, bind its parameters to plain identifiers,
/// and return either nothing or a `Result` whose error type implements
/// `From<QueueError>`.
#[proc_macro_attribute]
pub fn service_client(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as client::ClientArgs);
    let item = parse_macro_input!(item as ItemTrait);

    client::expand(args, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
