/// Creates one [`InvocationRequest`](crate::InvocationRequest) with inline
/// JSON arguments.
///
/// ```rust
/// use mcpwire::mcp_call;
///
/// let request = mcp_call!("call-1", "secure_search", {"query": "vpn", "max_results": 3});
/// assert_eq!(request.function, "secure_search");
/// assert_eq!(request.arguments["max_results"], 3);
///
/// let bare = mcp_call!("call-2", "public_status");
/// assert!(bare.arguments.as_object().is_some_and(|map| map.is_empty()));
/// ```
#[macro_export]
macro_rules! mcp_call {
    ($id:expr, $function:expr $(,)?) => {
        $crate::util::call($id, $function, $crate::serde_json::json!({}))
    };
    ($id:expr, $function:expr, $($arguments:tt)+) => {
        $crate::util::call($id, $function, $crate::serde_json::json!($($arguments)+))
    };
}

/// Creates a batch of requests with call ids `call-1`, `call-2`, ... in
/// declaration order.
///
/// ```rust
/// use mcpwire::mcp_calls;
///
/// let requests = mcp_calls![
///     "secure_search" => {"query": "vpn"},
///     "get_document" => {"document_id": "doc-7"},
/// ];
///
/// assert_eq!(requests.len(), 2);
/// assert_eq!(requests[1].call_id.as_str(), "call-2");
/// assert_eq!(requests[1].arguments["document_id"], "doc-7");
/// ```
#[macro_export]
macro_rules! mcp_calls {
    () => {
        Vec::<$crate::InvocationRequest>::new()
    };
    ($($function:expr => $arguments:tt),+ $(,)?) => {{
        let mut requests = Vec::<$crate::InvocationRequest>::new();
        $(
            let id = format!("call-{}", requests.len() + 1);
            requests.push($crate::mcp_call!(id, $function, $arguments));
        )+
        requests
    }};
}
