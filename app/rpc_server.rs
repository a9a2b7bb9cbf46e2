use std::net::SocketAddr;

use jsonrpsee::{
    core::{RpcResult, async_trait},
    server::{RpcServiceBuilder, Server},
    types::ErrorObject,
};
use predmarket::{
    state::{Market, MarketId, Side},
    types::Address,
};
use predmarket_app_rpc_api::{
    MarketDetails, MarketSummary, RedemptionInfo, RpcServer,
};
use tower_http::{
    request_id::{
        MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
    },
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};

use crate::app::App;

fn custom_err_msg(err_msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(-1, err_msg.into(), Option::<()>::None)
}

fn custom_err<Error>(error: Error) -> ErrorObject<'static>
where
    anyhow::Error: From<Error>,
{
    let error = anyhow::Error::from(error);
    custom_err_msg(format!("{error:#}"))
}

fn parse_market_id(market_id: &str) -> RpcResult<MarketId> {
    market_id.parse().map_err(custom_err)
}

fn market_details(market: &Market) -> MarketDetails {
    MarketDetails {
        market_id: market.id(),
        owner: market.owner(),
        state: market.state(),
        outcome: market.outcome(),
        question: market.question().to_owned(),
        description: market.description().to_owned(),
        collateral_reserve: market.collateral_reserve(),
        yes_pool: market.pool(Side::Yes),
        no_pool: market.pool(Side::No),
        total_yes_supply: market.total_supply(Side::Yes),
        total_no_supply: market.total_supply(Side::No),
        yes_price: market.spot_price(Side::Yes).ok().map(|p| p.to_string()),
        no_price: market.spot_price(Side::No).ok().map(|p| p.to_string()),
        created_at: market.created_at(),
    }
}

pub struct RpcServerImpl {
    app: App,
}

#[async_trait]
impl RpcServer for RpcServerImpl {
    async fn buy_shares(
        &self,
        market_id: String,
        buyer: Address,
        side: Side,
        payment: u64,
        min_shares_out: u64,
    ) -> RpcResult<u64> {
        let market_id = parse_market_id(&market_id)?;
        let mut state = self.app.state.write();
        state
            .buy_shares(market_id, buyer, side, payment, min_shares_out)
            .map_err(custom_err)
    }

    async fn collateral_balance(&self, account: Address) -> RpcResult<u64> {
        let state = self.app.state.read();
        Ok(state.collateral_balance(&account))
    }

    async fn create_market(
        &self,
        owner: Address,
        question: String,
        description: String,
    ) -> RpcResult<String> {
        let mut state = self.app.state.write();
        let market_id = state
            .create_market(owner, question, description)
            .map_err(custom_err)?;
        Ok(market_id.to_string())
    }

    async fn deposit(&self, account: Address, amount: u64) -> RpcResult<u64> {
        let mut state = self.app.state.write();
        state.deposit(account, amount).map_err(custom_err)
    }

    async fn get_market(&self, market_id: String) -> RpcResult<MarketDetails> {
        let market_id = parse_market_id(&market_id)?;
        let state = self.app.state.read();
        let market = state.market(&market_id).map_err(custom_err)?;
        Ok(market_details(market))
    }

    async fn initialize_market(
        &self,
        market_id: String,
        owner: Address,
        deposit: u64,
    ) -> RpcResult<u64> {
        let market_id = parse_market_id(&market_id)?;
        let mut state = self.app.state.write();
        state
            .initialize_market(market_id, owner, deposit)
            .map_err(custom_err)
    }

    async fn list_markets(&self) -> RpcResult<Vec<MarketSummary>> {
        let state = self.app.state.read();
        let summaries = state
            .markets()
            .iter()
            .map(|market| MarketSummary {
                market_id: market.id(),
                question: market.question().to_owned(),
                state: market.state(),
                collateral_reserve: market.collateral_reserve(),
                yes_pool: market.pool(Side::Yes),
                no_pool: market.pool(Side::No),
                created_at: market.created_at(),
            })
            .collect();
        Ok(summaries)
    }

    async fn market_count(&self) -> RpcResult<u64> {
        let state = self.app.state.read();
        Ok(state.market_count() as u64)
    }

    async fn redeem_shares(
        &self,
        market_id: String,
        redeemer: Address,
    ) -> RpcResult<RedemptionInfo> {
        let market_id = parse_market_id(&market_id)?;
        let mut state = self.app.state.write();
        let (shares_redeemed, payout) = state
            .redeem_shares(market_id, redeemer)
            .map_err(custom_err)?;
        Ok(RedemptionInfo {
            shares_redeemed,
            payout,
        })
    }

    async fn resolve_market(
        &self,
        market_id: String,
        owner: Address,
        outcome: Side,
    ) -> RpcResult<()> {
        let market_id = parse_market_id(&market_id)?;
        let mut state = self.app.state.write();
        state
            .resolve_market(market_id, owner, outcome)
            .map_err(custom_err)
    }

    async fn sell_shares(
        &self,
        market_id: String,
        seller: Address,
        side: Side,
        shares_in: u64,
        min_payment_out: u64,
    ) -> RpcResult<u64> {
        let market_id = parse_market_id(&market_id)?;
        let mut state = self.app.state.write();
        state
            .sell_shares(market_id, seller, side, shares_in, min_payment_out)
            .map_err(custom_err)
    }

    async fn share_balance(
        &self,
        market_id: String,
        side: Side,
        account: Address,
    ) -> RpcResult<u64> {
        let market_id = parse_market_id(&market_id)?;
        let state = self.app.state.read();
        state
            .share_balance(&market_id, side, &account)
            .map_err(custom_err)
    }

    async fn spot_price(
        &self,
        market_id: String,
        side: Side,
    ) -> RpcResult<String> {
        let market_id = parse_market_id(&market_id)?;
        let state = self.app.state.read();
        let price = state.spot_price(&market_id, side).map_err(custom_err)?;
        Ok(price.to_string())
    }

    async fn stop(&self) {
        std::process::exit(0);
    }

    async fn withdraw(&self, account: Address, amount: u64) -> RpcResult<u64> {
        let mut state = self.app.state.write();
        state.withdraw(account, amount).map_err(custom_err)
    }
}

#[derive(Clone, Debug)]
struct RequestIdMaker;

impl MakeRequestId for RequestIdMaker {
    fn make_request_id<B>(
        &mut self,
        _: &http::Request<B>,
    ) -> Option<RequestId> {
        use uuid::Uuid;
        let id = Uuid::new_v4();
        let id = id.as_simple();
        let id = format!("req_{id}");

        let Ok(header_value) = http::HeaderValue::from_str(&id) else {
            return None;
        };

        Some(RequestId::new(header_value))
    }
}

pub async fn run_server(
    app: App,
    rpc_url: url::Url,
) -> anyhow::Result<SocketAddr> {
    const REQUEST_ID_HEADER: &str = "x-request-id";

    let tracer = tower::ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            http::HeaderName::from_static(REQUEST_ID_HEADER),
            RequestIdMaker,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(http::HeaderName::from_static(REQUEST_ID_HEADER))
                        .and_then(|h| h.to_str().ok())
                        .filter(|s| !s.is_empty());

                    tracing::span!(
                        tracing::Level::DEBUG,
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id,
                    )
                })
                .on_request(())
                .on_eos(())
                .on_response(
                    DefaultOnResponse::new().level(tracing::Level::INFO),
                )
                .on_failure(
                    DefaultOnFailure::new().level(tracing::Level::ERROR),
                ),
        )
        .layer(PropagateRequestIdLayer::new(http::HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .into_inner();

    let http_middleware = tower::ServiceBuilder::new().layer(tracer);
    let rpc_middleware = RpcServiceBuilder::new().rpc_logger(1024);

    let server = Server::builder()
        .set_http_middleware(http_middleware)
        .set_rpc_middleware(rpc_middleware)
        .build(rpc_url.socket_addrs(|| None)?.as_slice())
        .await?;

    let addr = server.local_addr()?;
    let handle = server.start(RpcServerImpl { app }.into_rpc());

    tokio::spawn(handle.stopped());

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use predmarket::{
        state::{MarketState, State},
        types::Address,
    };

    use super::market_details;

    #[test]
    fn test_market_details_wire_shape() {
        let mut state = State::new();
        let owner = Address([0xab; 20]);
        state.deposit(owner, 100).unwrap();
        let market_id = state
            .create_market(
                owner,
                "Will it rain tomorrow?".to_owned(),
                "Resolves YES on any recorded rainfall".to_owned(),
            )
            .unwrap();
        state.initialize_market(market_id, owner, 100).unwrap();

        let market = state.market(&market_id).unwrap();
        let details = serde_json::to_value(market_details(market)).unwrap();

        assert_eq!(
            details["market_id"],
            serde_json::json!(market_id.to_string())
        );
        assert_eq!(
            details["owner"],
            serde_json::json!("abababababababababababababababababababab")
        );
        assert_eq!(details["state"], serde_json::json!("Open"));
        assert_eq!(details["outcome"], serde_json::Value::Null);
        assert_eq!(details["collateral_reserve"], serde_json::json!(100));
        assert_eq!(details["yes_pool"], serde_json::json!(50));
        assert_eq!(details["no_pool"], serde_json::json!(50));
        assert_eq!(details["total_yes_supply"], serde_json::json!(50));
        assert_eq!(details["total_no_supply"], serde_json::json!(50));
        assert_eq!(
            details["yes_price"],
            serde_json::json!("1000000000000000000")
        );
        assert_eq!(
            details["no_price"],
            serde_json::json!("1000000000000000000")
        );
        assert!(details["created_at"].is_u64());
    }

    #[test]
    fn test_market_details_prices_absent_before_initialize() {
        let mut state = State::new();
        let owner = Address([1; 20]);
        let market_id = state
            .create_market(owner, "Q".to_owned(), String::new())
            .unwrap();

        let market = state.market(&market_id).unwrap();
        let details = market_details(market);

        assert_eq!(details.state, MarketState::Uninitialized);
        assert_eq!(details.yes_price, None);
        assert_eq!(details.no_price, None);
    }
}
