//! Assembles `register.do` payloads from order data.

use crate::config::GatewayConfig;
use crate::domain::customer::CustomerDetails;
use crate::domain::gateway::{BundleItem, CartItems, GatewayRequest, ItemQuantity, OrderBundle};
use crate::domain::money::{CurrencyCode, MinorUnits};
use crate::domain::order::{CartItem, Order, Payment};
use crate::domain::ports::{CurrencyConverterRef, TemplateRendererRef};
use crate::error::{GatewayError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Differences up to this many major units are treated as a full payment.
const PARTIAL_PAYMENT_TOLERANCE: Decimal = dec!(0.01);

/// Placeholder unit label for cart rows that are not catalog products.
const NON_PRODUCT_MEASURE: &str = "-";

#[derive(Clone)]
pub struct RequestBuilder {
    config: Arc<GatewayConfig>,
    converter: CurrencyConverterRef,
    renderer: TemplateRendererRef,
}

/// A cart row converted into the registration currency.
struct PricedItem<'a> {
    item: &'a CartItem,
    price: MinorUnits,
    amount: MinorUnits,
}

impl RequestBuilder {
    pub fn new(
        config: Arc<GatewayConfig>,
        converter: CurrencyConverterRef,
        renderer: TemplateRendererRef,
    ) -> Self {
        Self {
            config,
            converter,
            renderer,
        }
    }

    pub fn build(&self, order: &Order, payment: &Payment, cart: &[CartItem]) -> Result<GatewayRequest> {
        self.build_at(order, payment, cart, Utc::now())
    }

    /// Builds the request as of `now`, which fixes the order number suffix and the
    /// bundle's creation date.
    pub fn build_at(
        &self,
        order: &Order,
        payment: &Payment,
        cart: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<GatewayRequest> {
        let target = self.config.registration_currency(order.currency());
        let currency = target.numeric().ok_or_else(|| {
            GatewayError::Validation(format!("currency {target} has no numeric ISO code"))
        })?;

        let payment_amount = self.convert(payment.amount.amount, &payment.amount.currency, &target)?;
        let order_amount = self.convert(order.amount.amount, order.currency(), &target)?;
        let amount = MinorUnits::from_major(payment_amount)?;

        let customer = CustomerDetails::from_order(order);
        let mut json_params = BTreeMap::from([("CMS".to_string(), self.config.cms_label.clone())]);
        if let Some(email) = &customer.email {
            json_params.insert("email".to_string(), email.clone());
        }
        if let Some(phone) = &customer.phone {
            json_params.insert("phone".to_string(), phone.clone());
        }

        let order_bundle = if customer.is_empty() {
            None
        } else {
            let is_partial = (order_amount - payment_amount).abs() > PARTIAL_PAYMENT_TOLERANCE;
            let mut items = self.price_items(cart, order.currency(), &target)?;
            let items_total: i128 = items.iter().map(|i| i128::from(i.amount.value())).sum();
            // Full payments only drift by per-item rounding; partial ones follow the setting.
            let rescale = if is_partial {
                self.config.partial_payment_scaling
            } else {
                items_total != i128::from(amount.value())
            };
            if rescale {
                rescale_items(&mut items, amount);
            }
            Some(OrderBundle {
                order_creation_date: now.to_rfc3339_opts(SecondsFormat::Secs, false),
                customer_details: customer,
                cart_items: CartItems {
                    items: self.bundle_items(items),
                },
            })
        };

        let variables = BTreeMap::from([
            ("order_id", order.id.to_string()),
            ("site_name", self.config.site_name.clone()),
        ]);
        let description = self
            .renderer
            .render(&self.config.description_template, &variables)?;

        Ok(GatewayRequest {
            order_number: format!("{}-{}", order.id, now.timestamp()),
            amount,
            currency,
            language: self.config.language.clone(),
            json_params,
            return_url: self.config.return_url(payment.id, &payment.hash)?,
            description,
            order_bundle,
        })
    }

    fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal> {
        if from == to {
            Ok(amount)
        } else {
            self.converter.convert(amount, from, to)
        }
    }

    fn price_items<'a>(
        &self,
        cart: &'a [CartItem],
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Vec<PricedItem<'a>>> {
        cart.iter()
            .map(|item| {
                Ok(PricedItem {
                    item,
                    price: MinorUnits::from_major(self.convert(item.price, from, to)?)?,
                    amount: MinorUnits::from_major(self.convert(item.total()?, from, to)?)?,
                })
            })
            .collect()
    }

    fn bundle_items(&self, items: Vec<PricedItem<'_>>) -> Vec<BundleItem> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, priced)| BundleItem {
                position_id: index as u32 + 1,
                name: priced.item.name.clone(),
                quantity: ItemQuantity {
                    value: priced.item.count,
                    measure: self.measure(priced.item),
                },
                item_amount: priced.amount,
                item_price: priced.price,
                item_code: priced.item.id.clone(),
            })
            .collect()
    }

    fn measure(&self, item: &CartItem) -> String {
        match &item.product {
            Some(product) => product
                .measurement
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.config.units_label.clone()),
            None => NON_PRODUCT_MEASURE.to_string(),
        }
    }
}

/// Scales item amounts so they add up to `target` and recomputes unit prices.
fn rescale_items(items: &mut [PricedItem<'_>], target: MinorUnits) {
    let amounts: Vec<i64> = items.iter().map(|i| i.amount.value()).collect();
    let scaled = scale_amounts(&amounts, target.value());

    for (priced, amount) in items.iter_mut().zip(scaled) {
        priced.amount = MinorUnits::new(amount).unwrap_or(MinorUnits::ZERO);
        let price = Decimal::from(amount)
            .checked_div(priced.item.count)
            .map(|p| p.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|p| MinorUnits::from_major(p / Decimal::ONE_HUNDRED).ok());
        if let Some(price) = price {
            priced.price = price;
        }
    }
}

/// Distributes `target` over `amounts` proportionally, in minor units.
///
/// Shares are rounded down, so the residue is never negative and is added to the last
/// item. The result always sums to `target` exactly. A zero total leaves the amounts
/// untouched.
pub fn scale_amounts(amounts: &[i64], target: i64) -> Vec<i64> {
    let total: i128 = amounts.iter().map(|&a| a as i128).sum();
    if amounts.is_empty() || total <= 0 || target < 0 {
        return amounts.to_vec();
    }

    let mut scaled: Vec<i64> = amounts
        .iter()
        .map(|&a| (a as i128 * target as i128 / total) as i64)
        .collect();

    let residue = target - scaled.iter().sum::<i64>();
    if let Some(last) = scaled.last_mut() {
        *last += residue;
    }
    scaled
}
