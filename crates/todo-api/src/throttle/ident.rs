/// 匿名リクエストの識別子（クライアントIP）を決める
///
/// - `num_proxies` 未設定: X-Forwarded-For 全体（空白除去）、無ければ接続元アドレス
/// - `num_proxies = 0`: 接続元アドレス
/// - `num_proxies = n`: X-Forwarded-For の右から n 番目
pub fn client_ident(
    forwarded_for: Option<&str>,
    remote_addr: Option<&str>,
    num_proxies: Option<usize>,
) -> String {
    let remote = || remote_addr.unwrap_or("unknown").to_string();

    match (num_proxies, forwarded_for) {
        (Some(0), _) | (Some(_), None) => remote(),
        (Some(n), Some(xff)) => {
            let addrs: Vec<&str> = xff.split(',').collect();
            let index = addrs.len() - n.min(addrs.len());
            addrs[index].trim().to_string()
        }
        (None, Some(xff)) if !xff.trim().is_empty() => {
            xff.split_whitespace().collect::<String>()
        }
        (None, _) => remote(),
    }
}
