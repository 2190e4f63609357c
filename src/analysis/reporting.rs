use crate::core::repository::Repository;
use crate::core::simulation::TickSummary;

pub fn print_tick_summary(summary: &TickSummary) {
    println!("\nTick {} Summary", summary.tick);
    println!("----------------------------------------");
    println!("Bids: {} spot, {} capacity", summary.spot_bids, summary.capacity_bids);
    if !summary.spot.is_empty() {
        println!("Electricity Spot Markets:");
        for point in &summary.spot {
            println!("  {}: €{:.2}/MWh, {:.1} MW", point.market, point.price, point.volume);
        }
    }
    if !summary.capacity.is_empty() {
        println!("Capacity Markets:");
        for point in &summary.capacity {
            println!("  {}: €{:.2}/MW, {:.1} MW", point.market, point.price, point.volume);
        }
    }
    if !summary.co2.is_empty() {
        println!("CO2 Markets:");
        for point in &summary.co2 {
            println!("  {}: €{:.2}/tCO2", point.market, point.price);
        }
    }
    for (reserve, flow) in &summary.reserve_flows {
        println!("Reserve {}: flow {:.1} t", reserve, flow);
    }
    if summary.carried_allowances > 0 {
        println!("Banked allowances carried forward for {} plants", summary.carried_allowances);
    }
}

/// Per-plant dispatch outcome of one tick across all markets.
pub fn print_dispatch_details(repo: &Repository, tick: crate::Tick) {
    println!("\nDispatch Details (tick {}):", tick);
    println!("----------------------------------------");
    for plant in repo.power_plants() {
        let plans: Vec<_> = repo
            .markets()
            .filter_map(|market| repo.dispatch_plan(&plant.id, &market.id, tick))
            .collect();
        for plan in plans {
            println!(
                "{} in {}: bid {:.1} MW @ €{:.2}, {} {:.1} MW",
                plant.id, plan.market, plan.amount, plan.price, plan.status, plan.accepted_amount
            );
        }
    }
    println!("----------------------------------------");
}
